//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::ArchiverError;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Entries in the visited log
    pub total_visited: u64,

    /// Entries in the pending checkpoint
    pub pending: u64,

    /// Run history, oldest first
    pub runs: Vec<RunRecord>,

    /// Pages the extractor has analyzed
    pub pages_extracted: u64,

    /// Heading totals across extracted pages, index 0 is `h1`
    pub heading_totals: [u64; 6],

    pub paragraph_total: u64,

    pub link_total: u64,

    pub internal_link_total: u64,

    pub external_link_total: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(ArchiverError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, ArchiverError> {
    let mut stats = CrawlStatistics {
        total_visited: storage.count_visited()?,
        pending: storage.count_pending()?,
        runs: storage.list_runs()?,
        ..CrawlStatistics::default()
    };

    for page in storage.load_page_stats()? {
        stats.pages_extracted += 1;
        for (total, count) in stats.heading_totals.iter_mut().zip(page.heading_counts) {
            *total += u64::from(count);
        }
        stats.paragraph_total += u64::from(page.paragraph_count);
        stats.link_total += u64::from(page.link_count);
        stats.internal_link_total += u64::from(page.internal_link_count);
        stats.external_link_total += u64::from(page.external_link_count);
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages visited: {}", stats.total_visited);
    println!("  Pages pending: {}", stats.pending);
    println!();

    if !stats.runs.is_empty() {
        println!("Runs ({}):", stats.runs.len());
        for run in &stats.runs {
            println!(
                "  #{} {} -> {}: {} ({} pages)",
                run.id,
                run.started_at,
                run.finished_at.as_deref().unwrap_or("-"),
                run.status.to_db_string(),
                run.pages_visited
            );
        }
        println!();
    }

    if stats.pages_extracted > 0 {
        println!("Extracted Pages ({}):", stats.pages_extracted);
        for (level, total) in stats.heading_totals.iter().enumerate() {
            println!("  h{}: {}", level + 1, total);
        }
        println!("  Paragraphs: {}", stats.paragraph_total);

        let internal_share = if stats.link_total > 0 {
            (stats.internal_link_total as f64 / stats.link_total as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  Links: {} ({} internal, {} external, {:.1}% internal)",
            stats.link_total, stats.internal_link_total, stats.external_link_total, internal_share
        );
    }
}
