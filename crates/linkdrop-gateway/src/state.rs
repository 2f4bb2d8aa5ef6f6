use std::sync::Arc;

use axum::http::{header, HeaderMap};
use linkdrop_shortener::Shortener;
use linkdrop_upload::UploadService;

#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<dyn Shortener>,
    pub uploads: Arc<UploadService>,
    base_url: Option<String>,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        uploads: Arc<UploadService>,
        public_base_url: Option<String>,
    ) -> Self {
        let base_url = public_base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        Self {
            shortener,
            uploads,
            base_url,
        }
    }

    /// Base for generated links: the configured public URL, else the
    /// request's `Host` over plain http.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base_url) = &self.base_url {
            return base_url.clone();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{host}")
    }
}
