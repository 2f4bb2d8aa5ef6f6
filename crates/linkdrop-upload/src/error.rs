use linkdrop_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UploadError>;

/// Why a single file was refused by the validation pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("file name is longer than {max} characters")]
    NameTooLong { max: usize },
    #[error("file name contains forbidden characters")]
    ForbiddenCharacters,
    #[error("file extension {0} is not allowed")]
    DangerousExtension(String),
    #[error("file name contains the forbidden keyword \"{0}\"")]
    DangerousKeyword(String),
    #[error("file name {0} is reserved")]
    ReservedName(String),
    #[error("file type {0} is not allowed")]
    MimeNotAllowed(String),
    #[error("extension {extension:?} does not match file type {mimetype}")]
    ExtensionMismatch { mimetype: String, extension: String },
    #[error("file is too large ({size} bytes, max {max_mib} MiB)")]
    TooLarge { size: u64, max_mib: u64 },
    #[error("file content matches the forbidden pattern {0}")]
    MaliciousContent(String),
    #[error("image is {width}x{height}, the limit is {max} pixels per side")]
    ImageTooLarge { width: u32, height: u32, max: u32 },
    #[error("image is empty or corrupt")]
    InvalidImage,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file provided")]
    NoFiles,
    #[error("too many files: {count}, at most {max} per request")]
    TooManyFiles { count: usize, max: usize },
    #[error("{filename} exceeds the {limit} byte upload limit")]
    PayloadTooLarge { filename: String, limit: u64 },
    #[error("{filename} rejected: {reason}")]
    Rejected { filename: String, reason: Rejection },
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("stored file is missing: {0}")]
    FileMissing(String),
    #[error("no free file id after {0} attempts")]
    IdSpaceExhausted(usize),
    #[error("invalid content pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for UploadError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value.to_string())
    }
}
