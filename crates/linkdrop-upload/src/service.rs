use crate::compress::compress_image;
use crate::error::{Result, UploadError};
use crate::policy::{extension_of, MAX_FILES_PER_REQUEST};
use crate::validate::Validator;
use jiff::{SignedDuration, Timestamp};
use linkdrop_core::{mime_category, FileId, FileRecord, FileRepository, StorageError};
use linkdrop_generator::{Generator, RandomGenerator};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// Number of entries reported in [`FileStats::popular`].
pub const POPULAR_LIMIT: usize = 10;

const FILE_ID_LENGTH: usize = linkdrop_core::file_id::FILE_ID_LENGTH;
const STORED_NAME_LENGTH: usize = 12;

#[derive(Debug, Clone, TypedBuilder)]
pub struct UploadSettings {
    /// Root directory; images land in `images/`, everything else in `files/`.
    #[builder(setter(into))]
    pub uploads_dir: PathBuf,
    #[builder(default = MAX_FILES_PER_REQUEST)]
    pub max_files: usize,
    /// How many generated file ids to try before giving up.
    #[builder(default = 100)]
    pub max_id_attempts: usize,
}

impl UploadSettings {
    pub fn images_dir(&self) -> PathBuf {
        self.uploads_dir.join("images")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.uploads_dir.join("files")
    }
}

/// One file taken from a multipart request.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    /// Content type declared by the client.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            data,
        }
    }

    /// The declared content type, or one guessed from the file name.
    pub fn mimetype(&self) -> String {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.name)
                    .first_or_octet_stream()
                    .to_string()
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileStats {
    pub total_files: usize,
    pub total_size: u64,
    pub total_downloads: u64,
    /// File count per top-level MIME type ("image", "application", ...).
    pub files_by_type: BTreeMap<String, usize>,
    /// Most downloaded files, highest first.
    pub popular: Vec<FileRecord>,
}

/// Validates, stores and serves uploaded files.
pub struct UploadService {
    repository: Arc<dyn FileRepository>,
    file_ids: Arc<dyn Generator>,
    stored_names: Arc<dyn Generator>,
    validator: Validator,
    settings: UploadSettings,
}

impl UploadService {
    pub fn new(repository: Arc<dyn FileRepository>, settings: UploadSettings) -> Result<Self> {
        Self::with_generators(
            repository,
            Arc::new(RandomGenerator::new(FILE_ID_LENGTH)),
            Arc::new(RandomGenerator::new(STORED_NAME_LENGTH)),
            settings,
        )
    }

    pub fn with_generators(
        repository: Arc<dyn FileRepository>,
        file_ids: Arc<dyn Generator>,
        stored_names: Arc<dyn Generator>,
        settings: UploadSettings,
    ) -> Result<Self> {
        Ok(Self {
            repository,
            file_ids,
            stored_names,
            validator: Validator::new()?,
            settings,
        })
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Creates the image and file directories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.settings.images_dir()).await?;
        fs::create_dir_all(self.settings.files_dir()).await?;
        Ok(())
    }

    /// Validates every file, then stores them all.
    ///
    /// Nothing is written unless every file passes validation. If storing
    /// fails halfway, files and records written by this call are removed.
    pub async fn upload(
        &self,
        files: Vec<IncomingFile>,
        user_agent: Option<String>,
    ) -> Result<Vec<FileRecord>> {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        if files.len() > self.settings.max_files {
            return Err(UploadError::TooManyFiles {
                count: files.len(),
                max: self.settings.max_files,
            });
        }

        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            let mimetype = file.mimetype();
            if let Err(reason) = self.validator.validate(&file.name, &mimetype, &file.data) {
                info!(filename = %file.name, %mimetype, %reason, "upload rejected");
                return Err(UploadError::Rejected {
                    filename: file.name,
                    reason,
                });
            }
            accepted.push((file, mimetype));
        }

        let mut written = Written::default();
        let mut records = Vec::with_capacity(accepted.len());
        for (file, mimetype) in accepted {
            match self
                .store(file, mimetype, user_agent.clone(), &mut written)
                .await
            {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, "upload failed, removing files stored by this request");
                    self.roll_back(written).await;
                    return Err(e);
                }
            }
        }

        Ok(records)
    }

    async fn store(
        &self,
        file: IncomingFile,
        mimetype: String,
        user_agent: Option<String>,
        written: &mut Written,
    ) -> Result<FileRecord> {
        let is_image = mimetype.starts_with("image/");
        let dir = if is_image {
            self.settings.images_dir()
        } else {
            self.settings.files_dir()
        };
        let size = file.data.len() as u64;

        let (data, compression) = if is_image {
            let out = compress_image(file.data, mimetype.clone())
                .await
                .map_err(|e| UploadError::Io(std::io::Error::other(e)))?;
            (out.data, Some(out.info))
        } else {
            (file.data, None)
        };

        let (stored_filename, path) = self
            .write_new_file(&dir, &extension_of(&file.name), &data, written)
            .await?;

        let template = FileRecord {
            file_id: FileId::new_unchecked(""),
            original_name: file.name,
            stored_filename,
            mimetype,
            size,
            path,
            is_image,
            compression,
            upload_date: Timestamp::now(),
            downloads: 0,
            last_accessed: None,
            user_agent,
        };
        let record = self.insert_with_fresh_id(template).await?;
        written.ids.push(record.file_id.clone());

        info!(
            file_id = %record.file_id,
            mimetype = %record.mimetype,
            size = record.size,
            stored_bytes = data.len(),
            "stored upload"
        );
        Ok(record)
    }

    /// Writes `data` under a fresh random name in `dir`. Never replaces an
    /// existing file.
    async fn write_new_file(
        &self,
        dir: &Path,
        extension: &str,
        data: &[u8],
        written: &mut Written,
    ) -> Result<(String, PathBuf)> {
        for attempt in 1..=self.settings.max_id_attempts {
            let name = format!("{}{}", self.stored_names.generate(), extension);
            let path = dir.join(&name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(stored_filename = %name, attempt, "stored file name already taken");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            written.paths.push(path.clone());
            file.write_all(data).await?;
            file.flush().await?;
            return Ok((name, path));
        }
        Err(UploadError::IdSpaceExhausted(self.settings.max_id_attempts))
    }

    async fn insert_with_fresh_id(&self, template: FileRecord) -> Result<FileRecord> {
        for attempt in 1..=self.settings.max_id_attempts {
            let file_id = FileId::new_unchecked(self.file_ids.generate());
            if self.repository.exists(&file_id).await? {
                debug!(file_id = %file_id, attempt, "generated file id already taken");
                continue;
            }
            let record = FileRecord {
                file_id,
                ..template.clone()
            };
            match self.repository.insert(record.clone()).await {
                Ok(()) => return Ok(record),
                Err(StorageError::Conflict(id)) => {
                    debug!(file_id = %id, attempt, "file id taken by a concurrent upload");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(UploadError::IdSpaceExhausted(self.settings.max_id_attempts))
    }

    async fn roll_back(&self, written: Written) {
        for path in &written.paths {
            remove_file(path).await;
        }
        for id in &written.ids {
            if let Err(e) = self.repository.delete(id).await {
                warn!(file_id = %id, error = %e, "could not remove record during rollback");
            }
        }
    }

    /// Counts a download and returns the record whose `path` is to be served.
    pub async fn download(&self, id: &FileId) -> Result<FileRecord> {
        let record = self.info(id).await?;
        if !fs::try_exists(&record.path).await? {
            warn!(file_id = %id, path = %record.path.display(), "stored file is missing");
            return Err(UploadError::FileMissing(id.to_string()));
        }
        self.repository
            .record_download(id, Timestamp::now())
            .await?
            .ok_or_else(|| UploadError::NotFound(id.to_string()))
    }

    pub async fn info(&self, id: &FileId) -> Result<FileRecord> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| UploadError::NotFound(id.to_string()))
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        let mut records = self.repository.list().await?;
        records.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(records)
    }

    pub async fn stats(&self) -> Result<FileStats> {
        let mut records = self.list().await?;

        let mut files_by_type = BTreeMap::new();
        for record in &records {
            *files_by_type
                .entry(mime_category(&record.mimetype).to_string())
                .or_insert(0) += 1;
        }

        let stats = FileStats {
            total_files: records.len(),
            total_size: records.iter().map(|r| r.size).sum(),
            total_downloads: records.iter().map(|r| r.downloads).sum(),
            files_by_type,
            popular: Vec::new(),
        };

        records.sort_by(|a, b| b.downloads.cmp(&a.downloads));
        records.truncate(POPULAR_LIMIT);
        Ok(FileStats {
            popular: records,
            ..stats
        })
    }

    /// Removes the stored file and its record. A file that cannot be
    /// removed from disk is logged and the record is dropped anyway.
    pub async fn delete(&self, id: &FileId) -> Result<FileRecord> {
        let record = self.info(id).await?;
        remove_file(&record.path).await;
        let removed = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;
        info!(file_id = %id, "deleted upload");
        Ok(removed)
    }

    /// Deletes every file uploaded more than `max_age` ago. Returns how many
    /// were removed.
    pub async fn cleanup_older_than(&self, max_age: SignedDuration) -> Result<usize> {
        let cutoff = Timestamp::now()
            .checked_sub(max_age)
            .unwrap_or(Timestamp::MIN);

        let mut removed = 0;
        for record in self.repository.list().await? {
            if record.upload_date >= cutoff {
                continue;
            }
            remove_file(&record.path).await;
            if self.repository.delete(&record.file_id).await?.is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, %cutoff, "removed expired uploads");
        }
        Ok(removed)
    }
}

/// Artifacts created by an in-flight upload, removed again on failure.
#[derive(Debug, Default)]
struct Written {
    paths: Vec<PathBuf>,
    ids: Vec<FileId>,
}

async fn remove_file(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove stored file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdrop_generator::SeqGenerator;
    use linkdrop_storage::InMemoryRepository;

    fn service(dir: &Path) -> UploadService {
        let repo: Arc<dyn FileRepository> = Arc::new(InMemoryRepository::<FileRecord>::new());
        UploadService::with_generators(
            repo,
            Arc::new(SeqGenerator::with_prefix("f", 7)),
            Arc::new(SeqGenerator::with_prefix("stored", 6)),
            UploadSettings::builder().uploads_dir(dir).build(),
        )
        .unwrap()
    }

    fn text(name: &str, body: &str) -> IncomingFile {
        IncomingFile::new(name, Some("text/plain".to_string()), body.as_bytes().to_vec())
    }

    #[test]
    fn mimetype_falls_back_to_file_name() {
        let declared = IncomingFile::new("a.txt", Some("Text/Plain".to_string()), vec![]);
        assert_eq!(declared.mimetype(), "text/plain");

        let guessed = IncomingFile::new("a.pdf", None, vec![]);
        assert_eq!(guessed.mimetype(), "application/pdf");

        let unknown = IncomingFile::new("a.unknownext", Some(" ".to_string()), vec![]);
        assert_eq!(unknown.mimetype(), "application/octet-stream");
    }

    #[tokio::test]
    async fn stores_text_file_under_files_dir() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();

        let records = service
            .upload(vec![text("notes.TXT", "hello")], Some("test-agent".into()))
            .await
            .unwrap();

        let record = &records[0];
        assert_eq!(record.file_id.as_str(), "f0000000");
        assert_eq!(record.stored_filename, "stored000000.txt");
        assert_eq!(record.path, dir.path().join("files").join("stored000000.txt"));
        assert_eq!(record.size, 5);
        assert!(!record.is_image);
        assert!(record.compression.is_none());
        assert_eq!(record.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(tokio::fs::read(&record.path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_requests() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        assert!(matches!(
            service.upload(vec![], None).await,
            Err(UploadError::NoFiles)
        ));

        let files = (0..6).map(|i| text(&format!("n{i}.txt"), "x")).collect();
        assert!(matches!(
            service.upload(files, None).await,
            Err(UploadError::TooManyFiles { count: 6, max: 5 })
        ));
    }

    #[tokio::test]
    async fn one_bad_file_rejects_the_whole_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();

        let err = service
            .upload(
                vec![text("good.txt", "fine"), text("bad.txt", "<script>x</script>")],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Rejected { ref filename, .. } if filename == "bad.txt"));
        assert!(service.list().await.unwrap().is_empty());
        let mut entries = tokio::fs::read_dir(service.settings().files_dir()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_write_rolls_back_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        // only the files dir exists, so the image write fails
        tokio::fs::create_dir_all(service.settings().files_dir())
            .await
            .unwrap();

        let gif = IncomingFile::new("pic.gif", Some("image/gif".into()), tiny_gif());
        let err = service
            .upload(vec![text("first.txt", "one"), gif], None)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Io(_)));
        assert!(service.list().await.unwrap().is_empty());
        let first = service.settings().files_dir().join("stored000000.txt");
        assert!(!tokio::fs::try_exists(first).await.unwrap());
    }

    #[tokio::test]
    async fn download_counts_and_detects_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();
        let record = service
            .upload(vec![text("notes.txt", "hello")], None)
            .await
            .unwrap()
            .remove(0);

        let downloaded = service.download(&record.file_id).await.unwrap();
        assert_eq!(downloaded.downloads, 1);
        assert!(downloaded.last_accessed.is_some());

        tokio::fs::remove_file(&record.path).await.unwrap();
        assert!(matches!(
            service.download(&record.file_id).await,
            Err(UploadError::FileMissing(_))
        ));

        let unknown = FileId::new_unchecked("zzzzzzzz");
        assert!(matches!(
            service.download(&unknown).await,
            Err(UploadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_survives_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();
        let record = service
            .upload(vec![text("notes.txt", "hello")], None)
            .await
            .unwrap()
            .remove(0);
        tokio::fs::remove_file(&record.path).await.unwrap();

        service.delete(&record.file_id).await.unwrap();

        assert!(matches!(
            service.info(&record.file_id).await,
            Err(UploadError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(&record.file_id).await,
            Err(UploadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stats_group_by_top_level_type() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();
        let records = service
            .upload(
                vec![
                    text("a.txt", "aaa"),
                    text("b.txt", "bb"),
                    IncomingFile::new("c.gif", Some("image/gif".into()), tiny_gif()),
                ],
                None,
            )
            .await
            .unwrap();
        service.download(&records[1].file_id).await.unwrap();
        service.download(&records[1].file_id).await.unwrap();

        let stats = service.stats().await.unwrap();

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_size, 5 + tiny_gif().len() as u64);
        assert_eq!(stats.total_downloads, 2);
        assert_eq!(stats.files_by_type.get("text"), Some(&2));
        assert_eq!(stats.files_by_type.get("image"), Some(&1));
        assert_eq!(stats.popular[0].file_id, records[1].file_id);
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();
        let record = service
            .upload(vec![text("notes.txt", "hello")], None)
            .await
            .unwrap()
            .remove(0);

        let removed = service
            .cleanup_older_than(SignedDuration::from_hours(1))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let removed = service
            .cleanup_older_than(SignedDuration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!tokio::fs::try_exists(&record.path).await.unwrap());
    }

    /// Reports every id as free, so clashes only surface on insert.
    struct RacyRepository(InMemoryRepository<FileRecord>);

    #[async_trait::async_trait]
    impl FileRepository for RacyRepository {
        async fn get(&self, id: &FileId) -> linkdrop_core::error::Result<Option<FileRecord>> {
            FileRepository::get(&self.0, id).await
        }

        async fn exists(&self, _id: &FileId) -> linkdrop_core::error::Result<bool> {
            Ok(false)
        }

        async fn insert(&self, record: FileRecord) -> linkdrop_core::error::Result<()> {
            FileRepository::insert(&self.0, record).await
        }

        async fn record_download(
            &self,
            id: &FileId,
            at: Timestamp,
        ) -> linkdrop_core::error::Result<Option<FileRecord>> {
            FileRepository::record_download(&self.0, id, at).await
        }

        async fn delete(&self, id: &FileId) -> linkdrop_core::error::Result<Option<FileRecord>> {
            FileRepository::delete(&self.0, id).await
        }

        async fn list(&self) -> linkdrop_core::error::Result<Vec<FileRecord>> {
            FileRepository::list(&self.0).await
        }
    }

    #[tokio::test]
    async fn id_taken_at_insert_time_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let shared = Arc::new(RacyRepository(InMemoryRepository::new()));
        let settings = UploadSettings::builder().uploads_dir(dir.path()).build();

        let first = UploadService::with_generators(
            shared.clone(),
            Arc::new(SeqGenerator::with_prefix("f", 7)),
            Arc::new(SeqGenerator::with_prefix("a", 6)),
            settings.clone(),
        )
        .unwrap();
        first.ensure_dirs().await.unwrap();
        first.upload(vec![text("one.txt", "1")], None).await.unwrap();

        // same id sequence, so the first id is already stored
        let second = UploadService::with_generators(
            shared,
            Arc::new(SeqGenerator::with_prefix("f", 7)),
            Arc::new(SeqGenerator::with_prefix("b", 6)),
            settings,
        )
        .unwrap();
        let record = second
            .upload(vec![text("two.txt", "2")], None)
            .await
            .unwrap()
            .remove(0);

        assert_eq!(record.file_id.as_str(), "f0000001");
        assert_eq!(second.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn existing_stored_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.ensure_dirs().await.unwrap();
        let taken = service.settings().files_dir().join("stored000000.txt");
        tokio::fs::write(&taken, "keep me").await.unwrap();

        let record = service
            .upload(vec![text("notes.txt", "new")], None)
            .await
            .unwrap()
            .remove(0);

        assert_eq!(record.stored_filename, "stored000001.txt");
        assert_eq!(tokio::fs::read_to_string(&taken).await.unwrap(), "keep me");
        assert_eq!(tokio::fs::read_to_string(&record.path).await.unwrap(), "new");
    }

    fn tiny_gif() -> Vec<u8> {
        use image::{ImageFormat, Rgb, RgbImage};
        let mut out = std::io::Cursor::new(Vec::new());
        RgbImage::from_pixel(4, 4, Rgb([200, 10, 10]))
            .write_to(&mut out, ImageFormat::Gif)
            .unwrap();
        out.into_inner()
    }
}
