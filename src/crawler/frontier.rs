//! Crawl frontier
//!
//! This module handles:
//! - The FIFO queue of normalized URLs pending a visit
//! - At-most-once enqueue and at-most-once visit
//! - The page budget, enforced without overshoot under concurrency
//! - Parking idle workers until work or budget frees up

use crate::state::CrawlState;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// What a worker should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Fetch this URL; it is now in flight
    Url(String),
    /// Nothing to hand out yet, but in-flight work may change that
    Wait,
    /// The crawl is over
    Done,
}

/// The crawl's working set
///
/// Every normalized URL the frontier knows about is in exactly one of:
/// - `pending`: queued, in FIFO order
/// - `in_flight`: handed to a worker, outcome not yet known
/// - `visited`: archived during this run
/// - `skipped`: failed during this run, not retried until a later run
/// - `archived`: visited in an earlier run
///
/// `enqueue` is a no-op for any URL already in one of those sets.
#[derive(Debug, Clone, Default)]
pub struct FrontierState {
    pending: VecDeque<String>,
    queued: HashSet<String>,
    in_flight: HashSet<String>,
    visited: HashSet<String>,
    skipped: HashSet<String>,
    archived: HashSet<String>,
}

impl FrontierState {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frontier from previously visited URLs and an ordered pending list
    ///
    /// Pending entries that were already visited or repeat an earlier entry
    /// are dropped.
    pub fn from_parts<P, V>(pending: P, previously_visited: V) -> Self
    where
        P: IntoIterator<Item = String>,
        V: IntoIterator<Item = String>,
    {
        let mut state = Self {
            archived: previously_visited.into_iter().collect(),
            ..Self::default()
        };

        for url in pending {
            state.enqueue(url);
        }

        state
    }

    /// Whether the frontier has seen `url` in any capacity
    pub fn contains(&self, url: &str) -> bool {
        self.queued.contains(url)
            || self.in_flight.contains(url)
            || self.visited.contains(url)
            || self.skipped.contains(url)
            || self.archived.contains(url)
    }

    /// Whether `url` has been visited, in this run or an earlier one
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url) || self.archived.contains(url)
    }

    /// Appends `url` to the tail of the queue unless it is already known
    ///
    /// Returns whether the URL was added.
    pub fn enqueue(&mut self, url: String) -> bool {
        if self.contains(&url) {
            return false;
        }

        self.queued.insert(url.clone());
        self.pending.push_back(url);
        true
    }

    /// Removes and returns the head of the queue, marking it in flight
    pub fn dequeue(&mut self) -> Option<String> {
        let url = self.pending.pop_front()?;
        self.queued.remove(&url);
        self.in_flight.insert(url.clone());
        Some(url)
    }

    /// Records `url` as visited in this run; idempotent
    pub fn mark_visited(&mut self, url: &str) {
        self.in_flight.remove(url);
        self.skipped.remove(url);
        if self.queued.remove(url) {
            self.pending.retain(|queued| queued != url);
        }
        self.visited.insert(url.to_string());
    }

    /// Records that `url` failed and must not be queued again this run
    pub fn mark_skipped(&mut self, url: &str) {
        if self.in_flight.remove(url) {
            self.skipped.insert(url.to_string());
        }
    }

    /// True once `max_pages` pages were visited in this run
    pub fn is_saturated(&self, max_pages: usize) -> bool {
        self.visited.len() >= max_pages
    }

    /// Hands out the next URL while the budget allows it
    ///
    /// A URL is only dispatched while `visited + in_flight < max_pages`, so
    /// concurrent workers can never archive more than `max_pages` pages.
    pub fn claim(&mut self, max_pages: usize) -> Claim {
        if self.is_saturated(max_pages) {
            return Claim::Done;
        }

        if self.visited.len() + self.in_flight.len() >= max_pages {
            return Claim::Wait;
        }

        match self.dequeue() {
            Some(url) => Claim::Url(url),
            None if self.in_flight.is_empty() => Claim::Done,
            None => Claim::Wait,
        }
    }

    /// Terminal state of a crawl that stopped with this frontier
    pub fn terminal_state(&self, max_pages: usize) -> CrawlState {
        if self.is_saturated(max_pages) {
            CrawlState::Saturated
        } else if self.pending.is_empty() && self.in_flight.is_empty() {
            CrawlState::Exhausted
        } else {
            CrawlState::Interrupted
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Pages visited in this run
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn skipped_len(&self) -> usize {
        self.skipped.len()
    }

    /// Pending URLs in queue order
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Pending URLs in queue order, for the checkpoint
    pub fn pending_snapshot(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }
}

/// Frontier shared by the crawl workers
///
/// All access goes through one mutex that is never held across an await.
/// Workers with nothing to do park on a `Notify` that fires whenever the
/// frontier changes.
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
    max_pages: usize,
}

impl Frontier {
    pub fn new(state: FrontierState, max_pages: usize) -> Self {
        Self {
            state: Mutex::new(state),
            changed: Notify::new(),
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // A worker that panicked mid-update leaves sets that are still valid
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits for the next URL to fetch
    ///
    /// Returns `None` once the crawl is saturated, exhausted, or `should_stop`
    /// reports true. Waiting only happens while URLs are in flight, and every
    /// in-flight URL eventually settles and wakes the waiters.
    pub async fn next(&self, should_stop: impl Fn() -> bool) -> Option<String> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if should_stop() {
                self.changed.notify_waiters();
                return None;
            }

            let claim = self.lock().claim(self.max_pages);
            match claim {
                Claim::Url(url) => return Some(url),
                Claim::Done => {
                    self.changed.notify_waiters();
                    return None;
                }
                Claim::Wait => notified.await,
            }
        }
    }

    /// Queues newly discovered links; returns how many were new
    pub fn enqueue_all(&self, links: impl IntoIterator<Item = String>) -> usize {
        let added = {
            let mut state = self.lock();
            links
                .into_iter()
                .filter(|link| state.enqueue(link.clone()))
                .count()
        };

        if added > 0 {
            self.changed.notify_waiters();
        }
        added
    }

    /// Settles an in-flight URL as visited; returns the run's visited count
    pub fn complete(&self, url: &str) -> usize {
        let visited = {
            let mut state = self.lock();
            state.mark_visited(url);
            state.visited_len()
        };
        self.changed.notify_waiters();
        visited
    }

    /// Settles an in-flight URL as failed
    pub fn skip(&self, url: &str) {
        self.lock().mark_skipped(url);
        self.changed.notify_waiters();
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending_len()
    }

    /// Copy of the current frontier, for the checkpoint once workers are done
    pub fn snapshot(&self) -> FrontierState {
        self.lock().clone()
    }

    /// Takes the frontier back once all workers are done
    pub fn into_state(self) -> FrontierState {
        self.state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
