use crate::error::Result;
use async_trait::async_trait;
use linkdrop_core::{ShortCode, UrlRecord};

/// Number of entries reported in [`UrlStats::popular`].
pub const POPULAR_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct ShortenParams {
    /// The URL as submitted. It is sanitized before anything else happens.
    pub original_url: String,
    /// Optional custom alias for the shortened URL.
    pub custom_alias: Option<String>,
    /// User-Agent of the submitting client, stored with the record.
    pub user_agent: Option<String>,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            ..Default::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ShortenOutcome {
    pub record: UrlRecord,
    /// `true` when the URL had already been shortened and the stored record
    /// was returned unchanged.
    pub existing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UrlStats {
    pub total_urls: usize,
    pub total_clicks: u64,
    /// Most clicked URLs, highest first.
    pub popular: Vec<UrlRecord>,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens a URL, or returns the existing record if it was shortened before.
    async fn shorten(&self, params: ShortenParams) -> Result<ShortenOutcome>;

    /// Looks up a code for a redirect, counting the visit.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Looks up a code without counting a visit.
    async fn info(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    async fn stats(&self) -> Result<UrlStats>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<UrlRecord>>;

    /// Returns `true` if the code existed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;
}
