//! HTTP API for the linkdrop URL shortener and file drop.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod rate_limit;
pub mod state;

pub use app::{App, AppSettings};
pub use rate_limit::RateLimit;
pub use state::AppState;
