//! Output module for post-crawl reporting
//!
//! This module handles:
//! - Extracting structural statistics and text from archived pages
//! - Summarising checkpoint contents and run history

pub mod extract;
pub mod stats;

pub use extract::{
    analyze_page, extract_statistics, run_extraction, text_file_name, ExtractionSummary,
    PageAnalysis,
};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
