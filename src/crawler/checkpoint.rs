//! Checkpoint load and save boundaries
//!
//! The crawl touches persisted state exactly twice: once before the first
//! dispatch to build the frontier, and once after every worker has joined to
//! write it back.

use crate::crawler::frontier::FrontierState;
use crate::state::CrawlState;
use crate::storage::{CheckpointWrite, RunStatus, Storage, VisitedRecord};
use crate::url::Normalizer;
use crate::ArchiverError;

/// Frontier rebuilt from the checkpoint (or the seeds)
#[derive(Debug)]
pub struct LoadedFrontier {
    pub state: FrontierState,
    /// Whether the pending list came from a checkpoint rather than the seeds
    pub resumed: bool,
    /// Size of the visited log carried over from earlier runs
    pub previously_visited: usize,
}

/// Builds the initial frontier
///
/// The visited log is always merged in. The pending list comes from the
/// checkpoint unless none was ever written or `fresh` is set, in which case
/// `seeds` is called. The two are read independently: an unreadable visited
/// log is logged and treated as empty, an unreadable pending list is logged
/// and treated as absent. Returns an error only when the seeds are needed and cannot be
/// produced or are empty.
pub fn load_frontier<S, F>(
    storage: &S,
    normalizer: &Normalizer,
    fresh: bool,
    seeds: F,
) -> Result<LoadedFrontier, ArchiverError>
where
    S: Storage + ?Sized,
    F: FnOnce() -> Result<Vec<String>, ArchiverError>,
{
    let visited = match storage.load_visited() {
        Ok(visited) => visited,
        Err(e) => {
            tracing::warn!("Visited log unreadable, treating it as empty: {}", e);
            Vec::new()
        }
    };

    let pending = if fresh {
        None
    } else {
        match storage.load_pending() {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!("Pending checkpoint unreadable, starting from seeds: {}", e);
                None
            }
        }
    };

    let previously_visited = visited.len();
    let visited_urls = visited.into_iter().map(|record| record.url);

    let (pending, resumed) = match pending {
        Some(pending) => {
            tracing::info!("Resuming from checkpoint with {} pending URLs", pending.len());
            if pending.is_empty() {
                tracing::info!("Pending checkpoint is empty; start a fresh crawl to revisit the seeds");
            }
            (pending, true)
        }
        None => {
            let seeds = seeds()?;
            if seeds.is_empty() {
                return Err(ArchiverError::Seeds(
                    "no pending checkpoint and no seed URLs".to_string(),
                ));
            }
            tracing::info!("Starting from {} seed URLs", seeds.len());
            (seeds, false)
        }
    };

    let pending = pending.iter().map(|url| normalizer.normalize(url));
    let state = FrontierState::from_parts(pending, visited_urls);

    Ok(LoadedFrontier {
        state,
        resumed,
        previously_visited,
    })
}

/// Writes the end-of-run checkpoint
///
/// Merges `new_records` into the visited log, replaces the pending list with
/// the frontier's queue and completes the run row, all atomically. Any
/// failure is surfaced: losing this write would mean redoing the run.
pub fn save_checkpoint<S: Storage + ?Sized>(
    storage: &mut S,
    location: &str,
    run_id: i64,
    final_state: &CrawlState,
    new_records: &[VisitedRecord],
    frontier: &FrontierState,
) -> Result<(), ArchiverError> {
    let pending = frontier.pending_snapshot();

    storage
        .save_checkpoint(&CheckpointWrite {
            run_id,
            status: RunStatus::from(final_state),
            pages_visited: new_records.len() as u64,
            new_records,
            pending: &pending,
        })
        .map_err(|source| ArchiverError::Checkpoint {
            path: location.to_string(),
            source,
        })?;

    tracing::info!(
        "Checkpoint written to {}: {} new pages, {} pending",
        location,
        new_records.len(),
        pending.len()
    );
    Ok(())
}
