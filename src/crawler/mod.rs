//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier with its dedup and budget rules
//! - HTTP fetching with UTM tagging and failure classification
//! - HTML parsing and in-domain link extraction
//! - Page archiving
//! - Checkpoint load/save and overall crawl coordination

mod archiver;
mod checkpoint;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use archiver::{archive_file_name, ArchiveError, PageArchiver};
pub use checkpoint::{load_frontier, save_checkpoint, LoadedFrontier};
pub use coordinator::{run_crawl, Coordinator, CrawlOptions, CrawlReport, StopSignal};
pub use fetcher::{
    build_http_client, FetchFailure, FetchResult, FetchedPage, Fetcher, HttpTransport,
    ReqwestTransport, TransportError, TransportResponse, UtmTags, MAX_REDIRECTS,
};
pub use frontier::{Claim, Frontier, FrontierState};
pub use parser::{extract_in_domain_links, parse_links};
