//! Checkpoint module for persisting crawl progress
//!
//! This module handles durable snapshots of the crawl state, including:
//! - The checkpoint record pairing the visited set with the pending frontier
//! - The versioned, checksummed on-disk format
//! - Atomic file writes (write to a temp file, then rename)
//! - Deciding when a periodic checkpoint is due

mod file;
mod format;
mod schedule;
mod traits;

pub use file::FileCheckpointStore;
pub use format::FORMAT_VERSION;
pub use schedule::CheckpointSchedule;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};

use std::collections::HashSet;

/// A consistent snapshot of crawl progress
///
/// Every URL in `frontier` was not yet recorded as visited when the snapshot
/// was taken, so resuming from it never loses or re-crawls completed work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    /// Canonical URLs that have been fully processed
    pub visited: HashSet<String>,

    /// Canonical URLs still waiting to be crawled, in queue order
    pub frontier: Vec<String>,
}

impl Checkpoint {
    /// Creates a checkpoint from its two records
    pub fn new(visited: HashSet<String>, frontier: Vec<String>) -> Self {
        Self { visited, frontier }
    }

    /// Returns true if there is no prior state at all
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty() && self.frontier.is_empty()
    }

    /// Returns true if the checkpoint has pending work to resume
    pub fn has_pending_work(&self) -> bool {
        !self.frontier.is_empty()
    }
}
