use std::collections::BTreeMap;

use jiff::Timestamp;
use linkdrop_core::{CompressionInfo, FileRecord};
use linkdrop_upload::FileStats;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub file_id: String,
    pub original_name: String,
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
    pub is_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionInfo>,
    pub upload_date: Timestamp,
    pub downloads: u64,
    pub last_accessed: Option<Timestamp>,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl FileData {
    pub fn new(record: FileRecord, base_url: &str) -> Self {
        let download_url = format!("{base_url}/api/upload/download/{}", record.file_id);
        let preview_url = record
            .is_image
            .then(|| format!("{base_url}/uploads/images/{}", record.stored_filename));
        Self {
            file_id: record.file_id.as_str().to_string(),
            original_name: record.original_name,
            filename: record.stored_filename,
            size: record.size,
            mimetype: record.mimetype,
            is_image: record.is_image,
            compression: record.compression,
            upload_date: record.upload_date,
            downloads: record.downloads,
            last_accessed: record.last_accessed,
            download_url,
            preview_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<FileData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularFile {
    pub file_id: String,
    pub original_name: String,
    pub downloads: u64,
    pub upload_date: Timestamp,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatsData {
    pub total_files: usize,
    pub total_size: u64,
    pub total_downloads: u64,
    pub files_by_type: BTreeMap<String, usize>,
    pub popular_files: Vec<PopularFile>,
}

impl From<FileStats> for FileStatsData {
    fn from(stats: FileStats) -> Self {
        Self {
            total_files: stats.total_files,
            total_size: stats.total_size,
            total_downloads: stats.total_downloads,
            files_by_type: stats.files_by_type,
            popular_files: stats
                .popular
                .into_iter()
                .map(|record| PopularFile {
                    file_id: record.file_id.as_str().to_string(),
                    original_name: record.original_name,
                    downloads: record.downloads,
                    upload_date: record.upload_date,
                })
                .collect(),
        }
    }
}
