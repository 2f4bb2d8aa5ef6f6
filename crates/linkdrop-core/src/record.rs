use crate::file_id::FileId;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A stored short URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub short_code: ShortCode,
    /// The normalized original URL.
    pub original_url: String,
    /// Number of redirects served. Only ever incremented.
    #[serde(default)]
    pub clicks: u64,
    pub created_at: Timestamp,
    #[serde(default)]
    pub last_accessed: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl UrlRecord {
    pub fn new(short_code: ShortCode, original_url: impl Into<String>) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            clicks: 0,
            created_at: Timestamp::now(),
            last_accessed: None,
            user_agent: None,
        }
    }
}

/// Outcome of recompressing an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionInfo {
    pub compressed: bool,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Saved space in whole percent.
    pub compression_ratio: i64,
}

impl CompressionInfo {
    /// Info for an image kept byte-for-byte.
    pub fn unchanged(size: u64) -> Self {
        Self {
            compressed: false,
            original_size: size,
            compressed_size: size,
            compression_ratio: 0,
        }
    }

    pub fn shrunk(original_size: u64, compressed_size: u64) -> Self {
        let ratio = if original_size == 0 {
            0
        } else {
            ((1.0 - compressed_size as f64 / original_size as f64) * 100.0).round() as i64
        };
        Self {
            compressed: true,
            original_size,
            compressed_size,
            compression_ratio: ratio,
        }
    }
}

/// A stored uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_id: FileId,
    pub original_name: String,
    /// Name of the file on disk.
    #[serde(rename = "filename")]
    pub stored_filename: String,
    pub mimetype: String,
    /// Size in bytes as uploaded, before any recompression.
    pub size: u64,
    pub path: PathBuf,
    pub is_image: bool,
    #[serde(default)]
    pub compression: Option<CompressionInfo>,
    pub upload_date: Timestamp,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub last_accessed: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Top-level MIME type ("image" for "image/png").
pub fn mime_category(mimetype: &str) -> &str {
    mimetype.split('/').next().unwrap_or(mimetype)
}
