//! State module for tracking crawl progress
//!
//! `CrawlState` is the state machine the coordinator walks through while it
//! drains the frontier.

mod crawl_state;

pub use crawl_state::CrawlState;
