//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::{initialize_schema, PENDING_SAVED_KEY};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CheckpointWrite, PageStatsRecord, RunRecord, RunStatus, VisitedRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    location: String,
}

impl SqliteStorage {
    /// Opens (creating if needed) the checkpoint database at `path`
    ///
    /// The parent directory is created when missing.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            location: path.display().to_string(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    /// Raw connection, for tests that need to damage the database
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Where the database lives, for user-facing messages
    pub fn location(&self) -> &str {
        &self.location
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        pages_visited: row.get::<_, i64>(5)? as u64,
    })
}

fn page_stats_from_row(row: &Row<'_>) -> rusqlite::Result<PageStatsRecord> {
    let mut heading_counts = [0u32; 6];
    for (level, count) in heading_counts.iter_mut().enumerate() {
        *count = row.get(2 + level)?;
    }

    Ok(PageStatsRecord {
        url: row.get(0)?,
        text_file_path: row.get(1)?,
        heading_counts,
        paragraph_count: row.get(8)?,
        link_count: row.get(9)?,
        internal_link_count: row.get(10)?,
        external_link_count: row.get(11)?,
        paragraph_character_count: row.get::<_, i64>(12)? as u64,
        average_title_length: row.get(13)?,
    })
}

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, pages_visited";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM runs ORDER BY id ASC", RUN_COLUMNS))?;

        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_visited: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_visited = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, pages_visited as i64, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Checkpoint =====

    fn load_pending(&self) -> StorageResult<Option<Vec<String>>> {
        let saved: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM checkpoint_meta WHERE key = ?1",
                params![PENDING_SAVED_KEY],
                |row| row.get(0),
            )
            .optional()?;

        if saved.is_none() {
            return Ok(None);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT urls FROM pending ORDER BY position ASC")?;

        let pending = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(pending))
    }

    fn load_visited(&self) -> StorageResult<Vec<VisitedRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT urls, html_file_path FROM visited ORDER BY rowid ASC")?;

        let records = stmt
            .query_map([], |row| {
                Ok(VisitedRecord {
                    url: row.get(0)?,
                    html_file_path: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn count_pending(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_visited(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visited", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn save_checkpoint(&mut self, checkpoint: &CheckpointWrite<'_>) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        {
            let mut insert_visited = tx.prepare(
                "INSERT OR IGNORE INTO visited (urls, html_file_path, run_id, visited_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in checkpoint.new_records {
                insert_visited.execute(params![
                    record.url,
                    record.html_file_path,
                    checkpoint.run_id,
                    now
                ])?;
            }

            tx.execute("DELETE FROM pending", [])?;

            let mut insert_pending =
                tx.prepare("INSERT OR IGNORE INTO pending (position, urls) VALUES (?1, ?2)")?;
            for (position, url) in checkpoint.pending.iter().enumerate() {
                insert_pending.execute(params![position as i64, url])?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO checkpoint_meta (key, value) VALUES (?1, ?2)",
            params![PENDING_SAVED_KEY, now],
        )?;

        let updated = tx.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_visited = ?3 WHERE id = ?4",
            params![
                checkpoint.status.to_db_string(),
                now,
                checkpoint.pages_visited as i64,
                checkpoint.run_id
            ],
        )?;

        if updated == 0 {
            // Dropping the transaction rolls everything back
            return Err(StorageError::RunNotFound(checkpoint.run_id));
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Page Statistics =====

    fn upsert_page_stats(&mut self, stats: &PageStatsRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let h = &stats.heading_counts;
        self.conn.execute(
            "INSERT OR REPLACE INTO page_stats (
                urls, text_file_path, h1_count, h2_count, h3_count, h4_count, h5_count, h6_count,
                paragraph_count, link_count, internal_link_count, external_link_count,
                paragraph_character_count, average_title_length, extracted_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                stats.url,
                stats.text_file_path,
                h[0],
                h[1],
                h[2],
                h[3],
                h[4],
                h[5],
                stats.paragraph_count,
                stats.link_count,
                stats.internal_link_count,
                stats.external_link_count,
                stats.paragraph_character_count as i64,
                stats.average_title_length,
                now
            ],
        )?;
        Ok(())
    }

    fn load_page_stats(&self) -> StorageResult<Vec<PageStatsRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT urls, text_file_path, h1_count, h2_count, h3_count, h4_count, h5_count,
             h6_count, paragraph_count, link_count, internal_link_count, external_link_count,
             paragraph_character_count, average_title_length
             FROM page_stats ORDER BY urls ASC",
        )?;

        let stats = stmt
            .query_map([], page_stats_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stats)
    }
}
