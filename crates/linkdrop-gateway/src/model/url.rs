use jiff::Timestamp;
use linkdrop_core::UrlRecord;
use linkdrop_shortener::UrlStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    #[serde(default)]
    pub url: String,
    pub custom_alias: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub success: bool,
    pub short_url: String,
    pub original_url: String,
    pub short_id: String,
    pub clicks: u64,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlData {
    pub short_id: String,
    pub original_url: String,
    pub short_url: String,
    pub clicks: u64,
    pub created_at: Timestamp,
    pub last_accessed: Option<Timestamp>,
}

impl UrlData {
    pub fn new(record: UrlRecord, base_url: &str) -> Self {
        Self {
            short_url: record.short_code.to_url(base_url),
            short_id: record.short_code.as_str().to_string(),
            original_url: record.original_url,
            clicks: record.clicks,
            created_at: record.created_at,
            last_accessed: record.last_accessed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlListResponse {
    pub success: bool,
    pub count: usize,
    pub urls: Vec<UrlData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularUrl {
    pub short_id: String,
    pub original_url: String,
    pub clicks: u64,
    pub created_at: Timestamp,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStatsData {
    pub total_urls: usize,
    pub total_clicks: u64,
    pub popular_urls: Vec<PopularUrl>,
}

impl From<UrlStats> for UrlStatsData {
    fn from(stats: UrlStats) -> Self {
        Self {
            total_urls: stats.total_urls,
            total_clicks: stats.total_clicks,
            popular_urls: stats
                .popular
                .into_iter()
                .map(|record| PopularUrl {
                    short_id: record.short_code.as_str().to_string(),
                    original_url: record.original_url,
                    clicks: record.clicks,
                    created_at: record.created_at,
                })
                .collect(),
        }
    }
}
