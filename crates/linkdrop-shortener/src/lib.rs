//! URL shortener service implementation.
//!
//! This crate provides the URL policy applied to every submitted link, the
//! [`Shortener`] trait consumed by the HTTP layer, and [`ShortenerService`],
//! its implementation over any [`UrlRepository`](linkdrop_core::UrlRepository).

pub mod error;
pub mod policy;
pub mod service;
pub mod shortener;

pub use error::ShortenerError;
pub use policy::sanitize_url;
pub use service::{ShortenerService, ShortenerSettings};
pub use shortener::{ShortenOutcome, ShortenParams, Shortener, UrlStats};
