//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the checkpoint database.
//! Column names of `pending` and `visited` (`urls`, `html_file_path`) are the
//! interface the statistics extractor depends on.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_visited INTEGER NOT NULL DEFAULT 0
);

-- Visited log: append/merge only, first-seen record wins
CREATE TABLE IF NOT EXISTS visited (
    urls TEXT PRIMARY KEY,
    html_file_path TEXT NOT NULL,
    run_id INTEGER,
    visited_at TEXT NOT NULL
);

-- Pending checkpoint: ordered frontier, overwritten at the end of each run
CREATE TABLE IF NOT EXISTS pending (
    position INTEGER PRIMARY KEY,
    urls TEXT NOT NULL UNIQUE
);

-- Checkpoint bookkeeping (e.g. whether a pending list was ever written)
CREATE TABLE IF NOT EXISTS checkpoint_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Per-page statistics produced by the extractor
CREATE TABLE IF NOT EXISTS page_stats (
    urls TEXT PRIMARY KEY,
    text_file_path TEXT NOT NULL,
    h1_count INTEGER NOT NULL DEFAULT 0,
    h2_count INTEGER NOT NULL DEFAULT 0,
    h3_count INTEGER NOT NULL DEFAULT 0,
    h4_count INTEGER NOT NULL DEFAULT 0,
    h5_count INTEGER NOT NULL DEFAULT 0,
    h6_count INTEGER NOT NULL DEFAULT 0,
    paragraph_count INTEGER NOT NULL DEFAULT 0,
    link_count INTEGER NOT NULL DEFAULT 0,
    internal_link_count INTEGER NOT NULL DEFAULT 0,
    external_link_count INTEGER NOT NULL DEFAULT 0,
    paragraph_character_count INTEGER NOT NULL DEFAULT 0,
    average_title_length REAL NOT NULL DEFAULT 0,
    extracted_at TEXT NOT NULL
);
"#;

/// Key in `checkpoint_meta` set once a pending list has been written
pub const PENDING_SAVED_KEY: &str = "pending_saved_at";

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
