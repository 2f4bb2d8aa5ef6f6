mod health;
mod redirect;
mod stats;
mod upload;
mod url;

pub use health::health_handler;
pub use redirect::redirect_handler;
pub use stats::stats_handler;
pub use upload::{
    delete_file_handler, download_handler, file_info_handler, file_stats_handler, upload_handler,
};
pub use url::{
    delete_url_handler, get_url_handler, list_urls_handler, shorten_handler, url_stats_handler,
};

use crate::error::AppError;
use axum::http::{header, HeaderMap};

pub async fn not_found_handler() -> AppError {
    AppError::NotFound("route not found".to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
