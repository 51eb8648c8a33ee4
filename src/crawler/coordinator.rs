//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Loading the frontier from the checkpoint or the seeds
//! - Running a pool of workers over the shared frontier
//! - Coordinating fetching, link extraction and archiving
//! - Handling interrupts and deadlines
//! - Writing the end-of-run checkpoint

use crate::config::{load_seeds_file, Config};
use crate::crawler::archiver::{ArchiveError, PageArchiver};
use crate::crawler::checkpoint::{load_frontier, save_checkpoint};
use crate::crawler::fetcher::{
    build_http_client, FetchFailure, FetchResult, FetchedPage, Fetcher, HttpTransport,
    ReqwestTransport, UtmTags,
};
use crate::crawler::frontier::{Frontier, FrontierState};
use crate::crawler::parser::extract_in_domain_links;
use crate::state::CrawlState;
use crate::storage::{open_storage, RunStatus, SqliteStorage, Storage, VisitedRecord};
use crate::url::{is_in_domain, root_domain, Normalizer};
use crate::ArchiverError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// How often (in archived pages) progress is logged
const PROGRESS_INTERVAL: usize = 10;

/// Per-run switches that are not part of the configuration file
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Ignore the pending checkpoint and start from the seeds
    pub fresh: bool,
    /// Read seeds from this file instead of the configuration
    pub seeds_file: Option<PathBuf>,
    /// Hash of the configuration file, recorded on the run
    pub config_hash: String,
}

/// Shared flag asking the workers to stop dispatching
///
/// In-flight requests are left to finish or time out.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,
    pub state: CrawlState,
    /// Pages archived during this run
    pub pages_visited: usize,
    /// Size of the visited log after the checkpoint
    pub total_visited: usize,
    pub pending: usize,
    /// URLs that failed during this run
    pub skipped: usize,
    pub checkpoint_location: String,
    pub elapsed: Duration,
}

/// Why one URL was skipped
#[derive(Debug, Error)]
enum PageError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchFailure),

    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: SqliteStorage,
    fetcher: Fetcher,
    archiver: PageArchiver,
    normalizer: Normalizer,
    frontier: FrontierState,
    previously_visited: usize,
    run_id: i64,
    stop: StopSignal,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP with `reqwest`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `options` - Fresh/resume choice, seeds file and config hash
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Storage opened, frontier loaded, run created
    /// * `Err(ArchiverError)` - The database cannot be opened, the HTTP
    ///   client cannot be built, or there is nothing to crawl
    pub fn new(config: Config, options: CrawlOptions) -> Result<Self, ArchiverError> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        Self::with_transport(config, options, Arc::new(ReqwestTransport::new(client)))
    }

    /// Creates a coordinator fetching through `transport`
    pub fn with_transport(
        config: Config,
        options: CrawlOptions,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ArchiverError> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        let normalizer = Normalizer::new(&config.crawler.canonical_scheme);

        let loaded = load_frontier(&storage, &normalizer, options.fresh, || {
            match &options.seeds_file {
                Some(path) => Ok(load_seeds_file(path)?),
                None => Ok(config.seeds.clone()),
            }
        })?;

        let mut storage = storage;
        let run_id = storage.create_run(&options.config_hash)?;

        tracing::info!(
            "Run {}: {} pending, {} visited in earlier runs ({})",
            run_id,
            loaded.state.pending_len(),
            loaded.previously_visited,
            if loaded.resumed { "resumed" } else { "seeded" }
        );

        let fetcher = Fetcher::new(transport, UtmTags::from_config(&config.tracking));
        let archiver = PageArchiver::new(&config.output.archive_dir);

        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
            archiver,
            normalizer,
            frontier: loaded.state,
            previously_visited: loaded.previously_visited,
            run_id,
            stop: StopSignal::new(),
        })
    }

    /// ID of the run row created for this crawl
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Handle that stops the crawl when triggered
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs the crawl to a terminal state and writes the checkpoint
    ///
    /// Per-URL failures are logged and skipped. The only errors returned are
    /// checkpoint-write failures, in which case the run row is marked failed.
    pub async fn run(mut self) -> Result<CrawlReport, ArchiverError> {
        let start_time = Instant::now();
        let max_pages = self.config.crawler.max_pages as usize;
        let workers = self.config.crawler.workers.max(1) as usize;
        let deadline = self
            .config
            .crawler
            .max_duration_secs
            .map(|secs| start_time + Duration::from_secs(secs));

        tracing::info!(
            "Run {} {} with {} workers, budget {} pages",
            self.run_id,
            CrawlState::Running,
            workers,
            max_pages
        );

        let context = Arc::new(CrawlContext {
            frontier: Frontier::new(std::mem::take(&mut self.frontier), max_pages),
            fetcher: self.fetcher.clone(),
            archiver: self.archiver.clone(),
            normalizer: self.normalizer.clone(),
            records: Mutex::new(Vec::new()),
            stop: self.stop.clone(),
            deadline,
            start_time,
        });

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let context = Arc::clone(&context);
                tokio::spawn(async move { crawl_worker(worker_id, context).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Crawl worker ended abnormally: {}", e);
            }
        }

        let frontier = context.frontier.snapshot();
        let records = context.take_records();
        let state = frontier.terminal_state(max_pages);

        match &state {
            CrawlState::Saturated => tracing::info!("Page budget of {} reached", max_pages),
            CrawlState::Exhausted => tracing::info!("Frontier exhausted"),
            CrawlState::Interrupted => tracing::info!("Crawl interrupted, saving progress"),
            _ => {}
        }

        let location = self.storage.location().to_string();
        if let Err(e) = save_checkpoint(
            &mut self.storage,
            &location,
            self.run_id,
            &state,
            &records,
            &frontier,
        ) {
            if let Err(mark) =
                self.storage
                    .finish_run(self.run_id, RunStatus::Failed, records.len() as u64)
            {
                tracing::warn!("Could not mark run {} as failed: {}", self.run_id, mark);
            }
            return Err(e);
        }

        let total_visited = match self.storage.count_visited() {
            Ok(count) => count as usize,
            Err(_) => self.previously_visited + records.len(),
        };

        let report = CrawlReport {
            run_id: self.run_id,
            state,
            pages_visited: records.len(),
            total_visited,
            pending: frontier.pending_len(),
            skipped: frontier.skipped_len(),
            checkpoint_location: location,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Crawl {}: {} pages archived in {:?}, {} failed, {} pending",
            report.state,
            report.pages_visited,
            report.elapsed,
            report.skipped,
            report.pending
        );

        Ok(report)
    }
}

/// Everything the workers share for one run
struct CrawlContext {
    frontier: Frontier,
    fetcher: Fetcher,
    archiver: PageArchiver,
    normalizer: Normalizer,
    /// Records archived during this run, in completion order
    records: Mutex<Vec<VisitedRecord>>,
    stop: StopSignal,
    deadline: Option<Instant>,
    start_time: Instant,
}

impl CrawlContext {
    fn should_stop(&self) -> bool {
        self.stop.is_triggered() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn push_record(&self, record: VisitedRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }

    fn take_records(&self) -> Vec<VisitedRecord> {
        std::mem::take(
            &mut *self
                .records
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Fetches, extracts and archives one URL
    ///
    /// Links are queued before archiving, so a page whose archive write fails
    /// still contributes its links.
    async fn visit(&self, url: &str) -> Result<VisitedRecord, PageError> {
        let page = match self.fetcher.fetch(url).await {
            FetchResult::Ok(page) => page,
            FetchResult::Redirected(page) => {
                tracing::debug!("Redirect followed from {} to {}", url, page.final_url);
                page
            }
            FetchResult::Failed(failure) => return Err(failure.into()),
        };

        if let Some(base) = link_base(&page) {
            let links = extract_in_domain_links(&base, &page.body, &self.normalizer);
            let found = links.len();
            let added = self.frontier.enqueue_all(links);
            tracing::trace!("{}: {} in-domain links, {} new", url, found, added);
        }

        let path = self.archiver.archive(url, &page.body).await?;
        Ok(VisitedRecord::new(url, path.display().to_string()))
    }
}

/// URL that relative links of a page resolve against
///
/// The final URL is used when a redirect stayed on the site; otherwise links
/// resolve against the requested URL so a redirect off-site cannot widen the
/// crawl.
fn link_base(page: &FetchedPage) -> Option<Url> {
    let requested = Url::parse(&page.url).ok()?;

    let stays_on_site = root_domain(&page.url)
        .map(|root| is_in_domain(&page.final_url, &root))
        .unwrap_or(false);

    if stays_on_site {
        Url::parse(&page.final_url).ok().or(Some(requested))
    } else {
        Some(requested)
    }
}

/// Settles an in-flight URL exactly once
///
/// Dropping the guard without settling (a panicking worker) counts as a
/// failure, so other workers are never left waiting on it.
struct InFlight<'a> {
    frontier: &'a Frontier,
    url: Option<String>,
}

impl<'a> InFlight<'a> {
    fn new(frontier: &'a Frontier, url: String) -> Self {
        Self {
            frontier,
            url: Some(url),
        }
    }

    fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    fn complete(mut self) -> usize {
        match self.url.take() {
            Some(url) => self.frontier.complete(&url),
            None => 0,
        }
    }

    fn skip(mut self) {
        if let Some(url) = self.url.take() {
            self.frontier.skip(&url);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(url) = self.url.take() {
            self.frontier.skip(&url);
        }
    }
}

async fn crawl_worker(worker_id: usize, context: Arc<CrawlContext>) {
    while let Some(url) = context.frontier.next(|| context.should_stop()).await {
        let in_flight = InFlight::new(&context.frontier, url);
        tracing::debug!("Worker {} crawling {}", worker_id, in_flight.url());

        match context.visit(in_flight.url()).await {
            Ok(record) => {
                context.push_record(record);
                let visited = in_flight.complete();

                if visited % PROGRESS_INTERVAL == 0 {
                    let elapsed = context.start_time.elapsed();
                    let rate = visited as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
                    tracing::info!(
                        "Progress: {} pages archived, {} pending, {:.2} pages/sec",
                        visited,
                        context.frontier.pending_len(),
                        rate
                    );
                }
            }
            Err(e) => {
                let state = CrawlState::Failed(in_flight.url().to_string());
                tracing::warn!("Skipping URL, {}: {}", state, e);
                in_flight.skip();
            }
        }
    }

    tracing::debug!("Worker {} finished", worker_id);
}

/// Runs a complete crawl with the HTTP transport
///
/// # Example
///
/// ```no_run
/// use site_archiver::config::load_config;
/// use site_archiver::crawler::{run_crawl, CrawlOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config, CrawlOptions::default()).await?;
/// println!("{} pages visited", report.total_visited);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, options: CrawlOptions) -> Result<CrawlReport, ArchiverError> {
    Coordinator::new(config, options)?.run().await
}
