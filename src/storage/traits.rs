//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CheckpointWrite, PageStatsRecord, RunRecord, RunStatus, VisitedRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// All crawl state passes through this boundary: the coordinator loads once
/// at start and writes one checkpoint at the end.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Lists all runs, oldest first
    fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;

    /// Marks a run finished without writing a checkpoint
    fn finish_run(&mut self, run_id: i64, status: RunStatus, pages_visited: u64)
        -> StorageResult<()>;

    // ===== Checkpoint =====

    /// Loads the pending checkpoint
    ///
    /// Returns `None` when no pending list has ever been written, which is
    /// different from an empty pending list left behind by an exhausted crawl.
    fn load_pending(&self) -> StorageResult<Option<Vec<String>>>;

    /// Loads the whole visited log in insertion order
    fn load_visited(&self) -> StorageResult<Vec<VisitedRecord>>;

    /// Counts rows in the pending checkpoint
    fn count_pending(&self) -> StorageResult<u64>;

    /// Counts rows in the visited log
    fn count_visited(&self) -> StorageResult<u64>;

    /// Writes the end-of-run checkpoint atomically
    ///
    /// Merges `new_records` into the visited log (existing URLs keep their
    /// record), replaces the pending list and completes the run.
    fn save_checkpoint(&mut self, checkpoint: &CheckpointWrite<'_>) -> StorageResult<()>;

    // ===== Page Statistics =====

    /// Inserts or replaces the statistics of one page
    fn upsert_page_stats(&mut self, stats: &PageStatsRecord) -> StorageResult<()>;

    /// Loads all page statistics
    fn load_page_stats(&self) -> StorageResult<Vec<PageStatsRecord>>;
}
