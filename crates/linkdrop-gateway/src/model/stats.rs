use jiff::Timestamp;
use serde::Serialize;

/// Combined report served by `/api/stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub success: bool,
    pub timestamp: Timestamp,
    pub urls: UrlSummary,
    pub files: FileSummary,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlSummary {
    pub total: usize,
    pub total_clicks: u64,
    pub today_created: usize,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub total: usize,
    pub total_size: u64,
    pub total_downloads: u64,
    pub today_uploaded: usize,
}
