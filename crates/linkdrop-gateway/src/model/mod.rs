mod stats;
mod upload;
mod url;

pub use stats::*;
pub use upload::*;
pub use url::*;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: jiff::Timestamp,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// `{success, data}` wrapper for single-record lookups.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse<T> {
    pub success: bool,
    pub stats: T,
}

impl<T> StatsResponse<T> {
    pub fn ok(stats: T) -> Self {
        Self {
            success: true,
            stats,
        }
    }
}
