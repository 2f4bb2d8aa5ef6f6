mod cli;

use crate::cli::CLI;
use clap::Parser;
use jiff::SignedDuration;
use linkdrop_core::shortcode::GENERATED_LENGTH;
use linkdrop_core::FileRepository;
use linkdrop_gateway::{App, AppSettings, AppState, RateLimit};
use linkdrop_generator::RandomGenerator;
use linkdrop_shortener::ShortenerService;
use linkdrop_storage::{JsonFileRepository, JsonStore, JsonUrlRepository};
use linkdrop_upload::{UploadService, UploadSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    linkdrop_telemetry::init(config.log_format.into())?;

    info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir.display(),
        uploads_dir = %config.uploads_dir.display(),
        log_format = %config.log_format,
        "starting linkdrop http server"
    );

    let urls: JsonUrlRepository = JsonStore::open(config.data_dir.join("urls.json")).await?;
    let files: JsonFileRepository = JsonStore::open(config.data_dir.join("files.json")).await?;
    let files: Arc<dyn FileRepository> = Arc::new(files);

    let shortener = ShortenerService::new(urls, RandomGenerator::new(GENERATED_LENGTH));
    let uploads = UploadService::new(
        files,
        UploadSettings::builder()
            .uploads_dir(config.uploads_dir.clone())
            .build(),
    )?;
    uploads.ensure_dirs().await?;
    let uploads = Arc::new(uploads);

    if let Some(days) = config.file_max_age_days {
        spawn_cleanup(uploads.clone(), SignedDuration::from_hours(i64::from(days) * 24));
    }

    let state = AppState::new(Arc::new(shortener), uploads, config.public_base_url);
    let rate_limited = !config.no_rate_limit;
    let limit = |limit: RateLimit| rate_limited.then_some(limit);
    let settings = AppSettings::builder()
        .frontend_url(config.frontend_url)
        .hsts(config.hsts)
        .general_limit(limit(RateLimit::GENERAL))
        .upload_limit(limit(RateLimit::UPLOAD))
        .url_limit(limit(RateLimit::URL))
        .build();
    if !rate_limited {
        info!("rate limiting disabled");
    }
    let router = App::router(state, &settings);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn spawn_cleanup(uploads: Arc<UploadService>, max_age: SignedDuration) {
    info!(%max_age, "scheduling hourly upload cleanup");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = uploads.cleanup_older_than(max_age).await {
                error!(error = %e, "upload cleanup failed");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
