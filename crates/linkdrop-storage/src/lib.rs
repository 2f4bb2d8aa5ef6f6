//! Storage backends for short URLs and uploaded file metadata.
//!
//! [`JsonStore`] is the production backend: each collection lives in a
//! single JSON object on disk that is rewritten wholesale on every
//! mutation. [`InMemoryRepository`] keeps everything in a `DashMap` and is
//! used by tests.

pub mod json;
pub mod memory;

pub use json::{Change, JsonFileRepository, JsonStore, JsonUrlRepository};
pub use linkdrop_core::error::{Result, StorageError};
pub use linkdrop_core::{FileRepository, UrlRepository};
pub use memory::InMemoryRepository;
