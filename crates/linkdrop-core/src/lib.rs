//! Core types and traits for the linkdrop service.
//!
//! This crate provides the domain types shared by the shortener, the
//! uploader, the storage backends and the HTTP gateway.

pub mod error;
pub mod file_id;
pub mod record;
pub mod repository;
pub mod shortcode;

pub use error::{CoreError, StorageError};
pub use file_id::FileId;
pub use record::{mime_category, CompressionInfo, FileRecord, UrlRecord};
pub use repository::{FileRepository, UrlRepository};
pub use shortcode::ShortCode;
