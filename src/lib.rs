//! Site-Archiver: a resumable single-site crawler
//!
//! This crate crawls one site breadth-first, archives every fetched page to disk,
//! and checkpoints the frontier so an interrupted crawl picks up where it stopped.
//! A downstream extractor mines the archived pages for structural statistics.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Archiver operations
///
/// Per-URL failures never surface here; they are logged and the URL is skipped.
/// Only configuration problems and checkpoint writes halt a run.
#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Failed to write checkpoint to {path}: {source}")]
    Checkpoint {
        path: String,
        source: storage::StorageError,
    },

    #[error("Seed list error: {0}")]
    Seeds(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Site-Archiver operations
pub type Result<T> = std::result::Result<T, ArchiverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use state::CrawlState;
pub use crate::url::{is_in_domain, normalize_url, root_domain, Normalizer};
