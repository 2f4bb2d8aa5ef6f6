//! File upload handling: the rule tables, the validation pipeline applied to
//! every incoming file, image recompression, and [`UploadService`] which
//! stores accepted files on disk and their metadata in a
//! [`FileRepository`](linkdrop_core::FileRepository).

pub mod compress;
pub mod error;
pub mod policy;
pub mod service;
pub mod validate;

pub use error::{Rejection, UploadError};
pub use service::{FileStats, IncomingFile, UploadService, UploadSettings};
pub use validate::Validator;
