use crate::error::Result;
use crate::file_id::FileId;
use crate::record::{FileRecord, UrlRecord};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Persistence for short URLs, keyed by short code.
#[async_trait]
pub trait UrlRepository: Send + Sync + 'static {
    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Finds the record whose normalized original URL equals `url`.
    async fn find_by_original_url(&self, url: &str) -> Result<Option<UrlRecord>>;

    /// Inserts a new record. Returns `Err(Conflict)` if the code already exists.
    async fn insert(&self, record: UrlRecord) -> Result<()>;

    /// Increments the click counter and stamps `last_accessed`.
    /// Returns the updated record, or `None` if the code does not exist.
    async fn record_click(&self, code: &ShortCode, at: Timestamp) -> Result<Option<UrlRecord>>;

    /// Deletes the record for a given short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;

    /// Returns every stored record, in no particular order.
    async fn list(&self) -> Result<Vec<UrlRecord>>;
}

/// Persistence for uploaded file metadata, keyed by file id.
#[async_trait]
pub trait FileRepository: Send + Sync + 'static {
    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>>;

    /// Checks whether a file id is already taken.
    async fn exists(&self, id: &FileId) -> Result<bool>;

    /// Inserts a new record. Returns `Err(Conflict)` if the id already exists.
    async fn insert(&self, record: FileRecord) -> Result<()>;

    /// Increments the download counter and stamps `last_accessed`.
    async fn record_download(&self, id: &FileId, at: Timestamp) -> Result<Option<FileRecord>>;

    /// Removes the record and returns it, if present.
    async fn delete(&self, id: &FileId) -> Result<Option<FileRecord>>;

    async fn list(&self) -> Result<Vec<FileRecord>>;
}
