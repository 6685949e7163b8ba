//! # Anchorpost - values, quotes and quote-card images
//!
//! Content management for daily "anchor" posts.
//!
//! Anchorpost provides:
//! - A relational model of core values, supporting values, authors and quotes
//! - SQLite-backed and JSON-file-backed stores behind one `Store` trait
//! - A heuristic importer for Notion CSV exports
//! - HTML quote-card templates rasterized to PNG by headless Chromium
//! - An HTTP API and admin pages over all of the above

pub mod model;
pub mod importer;
pub mod quality;
pub mod storage;
pub mod render;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{Author, CoreValue, Dataset, Quote, QuotePost, SupportingValue};
pub use storage::{JsonStore, SqliteStore, Store};

/// Result type alias for Anchorpost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Anchorpost operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Render timed out after {0} ms")]
    Timeout(u64),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),
}
