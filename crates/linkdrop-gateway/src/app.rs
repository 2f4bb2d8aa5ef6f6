use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware;
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use linkdrop_upload::policy::{MAX_FILES_PER_REQUEST, MAX_TRANSPORT_FILE_BYTES};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::handlers::{
    delete_file_handler, delete_url_handler, download_handler, file_info_handler,
    file_stats_handler, get_url_handler, health_handler, list_urls_handler, not_found_handler,
    redirect_handler, shorten_handler, stats_handler, upload_handler, url_stats_handler,
};
use crate::rate_limit::{rate_limit, ClientLimiter, RateLimit};
use crate::state::AppState;

pub const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Multipart overhead on top of the file bytes themselves.
const MULTIPART_SLACK: usize = 1024 * 1024;

pub const UPLOAD_BODY_LIMIT: usize =
    MAX_FILES_PER_REQUEST * MAX_TRANSPORT_FILE_BYTES as usize + MULTIPART_SLACK;

/// Origins always allowed by CORS besides the configured frontend.
pub const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:3002",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
    "http://127.0.0.1:3002",
    "http://127.0.0.1:5173",
];

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    style-src 'self' 'unsafe-inline'; \
    script-src 'self'; \
    img-src 'self' data: https: blob:; \
    connect-src 'self' http://localhost:* http://127.0.0.1:*; \
    font-src 'self'; \
    object-src 'none'; \
    media-src 'self'; \
    frame-src 'none'; \
    base-uri 'self'; \
    form-action 'self'; \
    upgrade-insecure-requests";

pub const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=()";

pub const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains; preload";

#[derive(Debug, Clone, TypedBuilder)]
pub struct AppSettings {
    #[builder(default, setter(into, strip_option))]
    pub frontend_url: Option<String>,
    /// Send `Strict-Transport-Security`. Only meaningful behind TLS.
    #[builder(default)]
    pub hsts: bool,
    /// `None` turns a limit off.
    #[builder(default = Some(RateLimit::GENERAL))]
    pub general_limit: Option<RateLimit>,
    #[builder(default = Some(RateLimit::UPLOAD))]
    pub upload_limit: Option<RateLimit>,
    #[builder(default = Some(RateLimit::URL))]
    pub url_limit: Option<RateLimit>,
}

pub struct App {}

impl App {
    pub fn router(state: AppState, settings: &AppSettings) -> Router {
        let uploads_dir = state.uploads.settings().uploads_dir.clone();

        let url_routes = Router::new()
            .route("/", get(list_urls_handler))
            .route("/shorten", post(shorten_handler))
            .route("/stats/all", get(url_stats_handler))
            .route(
                "/{short_id}",
                get(get_url_handler).delete(delete_url_handler),
            );

        let upload_routes = Router::new()
            .route(
                "/",
                post(upload_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            )
            .route("/stats", get(file_stats_handler))
            .route("/info/{file_id}", get(file_info_handler))
            .route("/download/{file_id}", get(download_handler))
            .route("/{file_id}", delete(delete_file_handler));

        let api = Router::new()
            .route("/health", get(health_handler))
            .route("/stats", get(stats_handler))
            .nest("/url", limited(url_routes, "url", settings.url_limit))
            .nest(
                "/upload",
                limited(upload_routes, "upload", settings.upload_limit),
            );

        let hsts = settings
            .hsts
            .then(|| HeaderValue::from_static(STRICT_TRANSPORT_SECURITY));

        Router::new()
            .nest("/api", limited(api, "api", settings.general_limit))
            .nest_service("/uploads", ServeDir::new(uploads_dir))
            .route("/{short_id}", get(redirect_handler))
            .fallback(not_found_handler)
            .with_state(state)
            .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
            .layer(cors_layer(settings))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_XSS_PROTECTION,
                HeaderValue::from_static("0"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(CONTENT_SECURITY_POLICY),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("cross-origin"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("permissions-policy"),
                HeaderValue::from_static(PERMISSIONS_POLICY),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::STRICT_TRANSPORT_SECURITY,
                move |_: &Response| hsts.clone(),
            ))
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
    }
}

/// Puts `router` behind a per-client limiter named `name`.
fn limited<S>(router: Router<S>, name: &'static str, limit: Option<RateLimit>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match limit.and_then(|limit| ClientLimiter::new(name, limit)) {
        Some(limiter) => router.layer(middleware::from_fn_with_state(limiter, rate_limit)),
        None => router,
    }
}

fn cors_layer(settings: &AppSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .frontend_url
        .iter()
        .map(String::as_str)
        .chain(DEV_ORIGINS.iter().copied())
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(origin, error = %e, "ignoring invalid cors origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}
