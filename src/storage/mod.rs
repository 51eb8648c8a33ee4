//! Storage module for persisting crawl state
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - The pending checkpoint (ordered frontier)
//! - The visited log (URL to archived file mapping)
//! - Run tracking
//! - Extracted page statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::CrawlState;
use crate::ArchiverError;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ArchiverError> {
    Ok(SqliteStorage::new(path)?)
}

/// One entry of the visited log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedRecord {
    /// Normalized URL
    pub url: String,
    /// Path of the archived HTML file
    pub html_file_path: String,
}

impl VisitedRecord {
    pub fn new(url: impl Into<String>, html_file_path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html_file_path: html_file_path.into(),
        }
    }
}

/// Everything written by the end-of-run checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointWrite<'a> {
    pub run_id: i64,
    pub status: RunStatus,
    /// Pages archived during this run
    pub pages_visited: u64,
    /// Records archived during this run, merged into the visited log
    pub new_records: &'a [VisitedRecord],
    /// Current pending frontier, replacing the previous checkpoint
    pub pending: &'a [String],
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_visited: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Running,
    Saturated,
    Exhausted,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Saturated => "saturated",
            Self::Exhausted => "exhausted",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "saturated" => Some(Self::Saturated),
            "exhausted" => Some(Self::Exhausted),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl From<&CrawlState> for RunStatus {
    fn from(state: &CrawlState) -> Self {
        match state {
            CrawlState::Running => Self::Running,
            CrawlState::Saturated => Self::Saturated,
            CrawlState::Exhausted => Self::Exhausted,
            CrawlState::Interrupted => Self::Interrupted,
            CrawlState::Failed(_) => Self::Failed,
        }
    }
}

/// Structural statistics of one archived page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageStatsRecord {
    pub url: String,
    pub text_file_path: String,
    /// Heading counts, index 0 is `h1`
    pub heading_counts: [u32; 6],
    pub paragraph_count: u32,
    pub link_count: u32,
    pub internal_link_count: u32,
    pub external_link_count: u32,
    pub paragraph_character_count: u64,
    pub average_title_length: f64,
}
