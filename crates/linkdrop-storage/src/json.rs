use async_trait::async_trait;
use jiff::Timestamp;
use linkdrop_core::error::{Result, StorageError};
use linkdrop_core::{FileId, FileRecord, FileRepository, ShortCode, UrlRecord, UrlRepository};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Short URLs persisted as `{ "<code>": UrlRecord, ... }`.
pub type JsonUrlRepository = JsonStore<UrlRecord>;

/// Uploaded files persisted as `{ "<fileId>": FileRecord, ... }`.
pub type JsonFileRepository = JsonStore<FileRecord>;

/// Result of a mutation closure passed to [`JsonStore::modify`].
pub enum Change<T> {
    /// The collection was changed and must be written back.
    Write(T),
    /// Nothing changed; skip the rewrite.
    Keep(T),
}

/// A flat-JSON collection: the whole map is one JSON object in one file.
///
/// Reads parse the entire file. Mutations load, mutate, and rewrite the
/// entire file. Rewrites go to a sibling temp file that is renamed over the
/// original, so readers never observe a half-written store. Mutations from
/// the same process are serialized by an async mutex; nothing guards
/// against a second process writing the same file.
#[derive(Debug)]
pub struct JsonStore<V> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Opens the store at `path`, creating parent directories and an empty
    /// `{}` collection if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        if !fs::try_exists(&path).await? {
            debug!(path = %path.display(), "initializing empty json store");
            fs::write(&path, "{}").await?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole collection.
    pub async fn read(&self) -> Result<BTreeMap<String, V>> {
        let raw = fs::read(&self.path).await?;
        trace!(path = %self.path.display(), bytes = raw.len(), "loaded json store");
        let map = serde_json::from_slice(&raw)?;
        Ok(map)
    }

    /// Runs a read-modify-write cycle under the store's write lock.
    pub async fn modify<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, V>) -> Result<Change<T>>,
    {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read().await?;
        match f(&mut map)? {
            Change::Keep(out) => Ok(out),
            Change::Write(out) => {
                self.write(&map).await?;
                Ok(out)
            }
        }
    }

    async fn write(&self, map: &BTreeMap<String, V>) -> Result<()> {
        let body = serde_json::to_vec_pretty(map)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &body).await?;
        fs::rename(&tmp, &self.path).await?;
        trace!(path = %self.path.display(), bytes = body.len(), "rewrote json store");
        Ok(())
    }
}

fn conflict(key: &str) -> StorageError {
    StorageError::Conflict(key.to_string())
}

#[async_trait]
impl UrlRepository for JsonStore<UrlRecord> {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.read().await?.remove(code.as_str()))
    }

    async fn find_by_original_url(&self, url: &str) -> Result<Option<UrlRecord>> {
        Ok(self
            .read()
            .await?
            .into_values()
            .find(|record| record.original_url == url))
    }

    async fn insert(&self, record: UrlRecord) -> Result<()> {
        self.modify(|urls| {
            let key = record.short_code.as_str().to_owned();
            if urls.contains_key(&key) {
                return Err(conflict(&key));
            }
            urls.insert(key, record);
            Ok(Change::Write(()))
        })
        .await
    }

    async fn record_click(&self, code: &ShortCode, at: Timestamp) -> Result<Option<UrlRecord>> {
        self.modify(|urls| match urls.get_mut(code.as_str()) {
            Some(record) => {
                record.clicks += 1;
                record.last_accessed = Some(at);
                Ok(Change::Write(Some(record.clone())))
            }
            None => Ok(Change::Keep(None)),
        })
        .await
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        self.modify(|urls| match urls.remove(code.as_str()) {
            Some(_) => Ok(Change::Write(true)),
            None => Ok(Change::Keep(false)),
        })
        .await
    }

    async fn list(&self) -> Result<Vec<UrlRecord>> {
        Ok(self.read().await?.into_values().collect())
    }
}

#[async_trait]
impl FileRepository for JsonStore<FileRecord> {
    async fn get(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.read().await?.remove(id.as_str()))
    }

    async fn exists(&self, id: &FileId) -> Result<bool> {
        Ok(self.read().await?.contains_key(id.as_str()))
    }

    async fn insert(&self, record: FileRecord) -> Result<()> {
        self.modify(|files| {
            let key = record.file_id.as_str().to_owned();
            if files.contains_key(&key) {
                return Err(conflict(&key));
            }
            files.insert(key, record);
            Ok(Change::Write(()))
        })
        .await
    }

    async fn record_download(&self, id: &FileId, at: Timestamp) -> Result<Option<FileRecord>> {
        self.modify(|files| match files.get_mut(id.as_str()) {
            Some(record) => {
                record.downloads += 1;
                record.last_accessed = Some(at);
                Ok(Change::Write(Some(record.clone())))
            }
            None => Ok(Change::Keep(None)),
        })
        .await
    }

    async fn delete(&self, id: &FileId) -> Result<Option<FileRecord>> {
        self.modify(|files| match files.remove(id.as_str()) {
            Some(record) => Ok(Change::Write(Some(record))),
            None => Ok(Change::Keep(None)),
        })
        .await
    }

    async fn list(&self) -> Result<Vec<FileRecord>> {
        Ok(self.read().await?.into_values().collect())
    }
}
