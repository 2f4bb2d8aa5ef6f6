use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use linkdrop_core::error::{Result, StorageError};
use linkdrop_core::{FileId, FileRecord, FileRepository, ShortCode, UrlRecord, UrlRepository};

/// In-memory implementation of the repository traits using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking.
#[derive(Debug)]
pub struct InMemoryRepository<V> {
    storage: DashMap<String, V>,
}

impl<V> InMemoryRepository<V> {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl<V> Default for InMemoryRepository<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> InMemoryRepository<V> {
    fn insert_new(&self, key: &str, value: V) -> Result<()> {
        // Check-and-insert under the shard lock: reject if the key is taken.
        match self.storage.entry(key.to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(key.to_owned())),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    fn values(&self) -> Vec<V> {
        self.storage.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl UrlRepository for InMemoryRepository<UrlRecord> {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.storage.get(code.as_str()).map(|e| e.value().clone()))
    }

    async fn find_by_original_url(&self, url: &str) -> Result<Option<UrlRecord>> {
        Ok(self
            .storage
            .iter()
            .find(|e| e.value().original_url == url)
            .map(|e| e.value().clone()))
    }

    async fn insert(&self, record: UrlRecord) -> Result<()> {
        let key = record.short_code.as_str().to_owned();
        self.insert_new(&key, record)
    }

    async fn record_click(&self, code: &ShortCode, at: Timestamp) -> Result<Option<UrlRecord>> {
        Ok(self.storage.get_mut(code.as_str()).map(|mut e| {
            e.clicks += 1;
            e.last_accessed = Some(at);
            e.value().clone()
        }))
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.storage.remove(code.as_str()).is_some())
    }

    async fn list(&self) -> Result<Vec<UrlRecord>> {
        Ok(self.values())
    }
}

#[async_trait]
impl FileRepository for InMemoryRepository<FileRecord> {
    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.storage.get(id.as_str()).map(|e| e.value().clone()))
    }

    async fn exists(&self, id: &FileId) -> Result<bool> {
        Ok(self.storage.contains_key(id.as_str()))
    }

    async fn insert(&self, record: FileRecord) -> Result<()> {
        let key = record.file_id.as_str().to_owned();
        self.insert_new(&key, record)
    }

    async fn record_download(&self, id: &FileId, at: Timestamp) -> Result<Option<FileRecord>> {
        Ok(self.storage.get_mut(id.as_str()).map(|mut e| {
            e.downloads += 1;
            e.last_accessed = Some(at);
            e.value().clone()
        }))
    }

    async fn delete(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.storage.remove(id.as_str()).map(|(_, record)| record))
    }

    async fn list(&self) -> Result<Vec<FileRecord>> {
        Ok(self.values())
    }
}
