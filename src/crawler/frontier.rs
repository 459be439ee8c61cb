//! Frontier queue and visited set
//!
//! The frontier holds pending URLs together with the visited set under a single
//! lock, so "check membership, then insert or push" is always one atomic step.
//! Every popped URL is represented by a [`Lease`]; the frontier counts as
//! drained only once the queue is empty and every lease has been released.

use crate::checkpoint::Checkpoint;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Outcome of claiming a leased URL for crawling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The URL was not visited before; `visited` is the number of URLs newly
    /// visited during this run, including this one
    Fresh { visited: usize },

    /// Another worker (or a previous run) already visited the URL
    AlreadyVisited,
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    /// URLs waiting in the queue
    pub pending: usize,

    /// URLs popped but not yet marked done
    pub in_flight: usize,

    /// Size of the visited set, including restored entries
    pub visited: usize,

    /// URLs visited during this run
    pub newly_visited: usize,
}

impl FrontierStats {
    /// Every URL known so far: visited plus waiting
    pub fn known(&self) -> usize {
        self.visited + self.pending
    }
}

#[derive(Debug)]
struct LeaseState {
    url: String,
    claimed: bool,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<String>,
    queued: HashMap<String, usize>,
    visited: HashSet<String>,
    leases: HashMap<u64, LeaseState>,
    next_lease: u64,
    newly_visited: usize,
    closed: bool,
}

impl FrontierState {
    fn enqueue(&mut self, url: String) {
        *self.queued.entry(url.clone()).or_insert(0) += 1;
        self.pending.push_back(url);
    }

    fn dequeue(&mut self) -> Option<String> {
        let url = self.pending.pop_front()?;
        if let Some(count) = self.queued.get_mut(&url) {
            *count -= 1;
            if *count == 0 {
                self.queued.remove(&url);
            }
        }
        Some(url)
    }

    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.leases.is_empty()
    }
}

enum Next<'a> {
    Ready(Lease<'a>),
    Finished,
    Wait,
}

/// Concurrent work queue of pending URLs with completion tracking
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier seeded from a checkpoint
    ///
    /// Pending entries that are already visited are dropped.
    pub fn restore(checkpoint: Checkpoint) -> Self {
        let mut state = FrontierState {
            visited: checkpoint.visited,
            ..FrontierState::default()
        };

        for url in checkpoint.frontier {
            if !state.visited.contains(&url) && !state.queued.contains_key(&url) {
                state.enqueue(url);
            }
        }

        Self {
            state: Mutex::new(state),
            changed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a URL to the pending work set
    ///
    /// Never blocks on other workers beyond the short critical section.
    pub fn push(&self, url: impl Into<String>) {
        self.lock().enqueue(url.into());
        self.changed.notify_waiters();
    }

    /// Queues every URL that is neither visited nor already waiting
    ///
    /// The membership checks and pushes happen under one lock acquisition.
    /// Returns how many URLs were queued.
    pub fn push_unvisited<I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let queued = {
            let mut state = self.lock();
            let mut queued = 0;
            for url in urls {
                if state.visited.contains(&url) || state.queued.contains_key(&url) {
                    continue;
                }
                state.enqueue(url);
                queued += 1;
            }
            queued
        };

        if queued > 0 {
            self.changed.notify_waiters();
        }
        queued
    }

    /// Removes and returns one URL, or `None` if nothing is pending
    ///
    /// Also returns `None` once the frontier has been closed.
    pub fn pop(&self) -> Option<Lease<'_>> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        let url = state.dequeue()?;
        Some(self.lease(&mut state, url))
    }

    /// Waits for the next URL to crawl
    ///
    /// Returns `None` when the frontier is drained or closed. While the queue
    /// is empty but other leases are outstanding, this waits for them to either
    /// push more work or finish.
    pub async fn next(&self) -> Option<Lease<'_>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_next() {
                Next::Ready(lease) => return Some(lease),
                Next::Finished => return None,
                Next::Wait => notified.await,
            }
        }
    }

    fn try_next(&self) -> Next<'_> {
        let mut state = self.lock();
        if state.closed {
            return Next::Finished;
        }
        match state.dequeue() {
            Some(url) => Next::Ready(self.lease(&mut state, url)),
            None if state.leases.is_empty() => Next::Finished,
            None => Next::Wait,
        }
    }

    fn lease(&self, state: &mut FrontierState, url: String) -> Lease<'_> {
        let id = state.next_lease;
        state.next_lease += 1;
        state.leases.insert(
            id,
            LeaseState {
                url: url.clone(),
                claimed: false,
            },
        );
        Lease {
            frontier: self,
            id,
            url,
        }
    }

    /// Atomically tests and sets visited membership for a leased URL
    pub fn claim(&self, lease: &Lease<'_>) -> Claim {
        let mut state = self.lock();
        if !state.visited.insert(lease.url.clone()) {
            return Claim::AlreadyVisited;
        }

        state.newly_visited += 1;
        if let Some(lease_state) = state.leases.get_mut(&lease.id) {
            lease_state.claimed = true;
        }
        Claim::Fresh {
            visited: state.newly_visited,
        }
    }

    fn mark_done(&self, lease_id: u64) {
        self.lock().leases.remove(&lease_id);
        self.changed.notify_waiters();
    }

    /// Waits until the queue is empty and every lease has been released
    pub async fn await_drained(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }

    /// Returns true if nothing is pending or in flight
    pub fn is_drained(&self) -> bool {
        self.lock().is_drained()
    }

    /// Stops handing out work; waiting workers see `None`
    ///
    /// Outstanding leases are unaffected and can still be marked done.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_waiters();
    }

    /// Returns true if the URL is in the visited set
    pub fn is_visited(&self, url: &str) -> bool {
        self.lock().visited.contains(url)
    }

    /// Returns current counters
    pub fn stats(&self) -> FrontierStats {
        let state = self.lock();
        FrontierStats {
            pending: state.pending.len(),
            in_flight: state.leases.len(),
            visited: state.visited.len(),
            newly_visited: state.newly_visited,
        }
    }

    /// Captures a mutually consistent visited set and frontier
    ///
    /// URLs claimed by a lease that is still outstanding go to the frontier, not
    /// the visited set: their links may not have been queued yet, so a resume
    /// must crawl them again. Unclaimed leased URLs that are not visited are
    /// kept in the frontier too. No saved frontier entry is in the saved
    /// visited set.
    pub fn snapshot(&self) -> Checkpoint {
        let state = self.lock();

        let mut leases: Vec<(&u64, &LeaseState)> = state.leases.iter().collect();
        leases.sort_by_key(|(id, _)| **id);

        let mut visited = state.visited.clone();
        for (_, lease) in &leases {
            if lease.claimed {
                visited.remove(&lease.url);
            }
        }

        let mut seen = HashSet::new();
        let frontier = leases
            .iter()
            .map(|(_, lease)| &lease.url)
            .chain(state.pending.iter())
            .filter(|url| !visited.contains(*url) && seen.insert(url.as_str()))
            .cloned()
            .collect();

        Checkpoint::new(visited, frontier)
    }
}

/// A URL handed out by the frontier
///
/// Dropping the lease marks it done, so a worker that bails out early (or
/// panics) cannot leave the crawl waiting forever.
#[derive(Debug)]
pub struct Lease<'a> {
    frontier: &'a Frontier,
    id: u64,
    url: String,
}

impl Lease<'_> {
    /// The leased URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Signals that processing of this URL, including queuing its links, is complete
    pub fn mark_done(self) {}
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.frontier.mark_done(self.id);
    }
}
