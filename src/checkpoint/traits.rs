//! Checkpoint store trait and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::checkpoint::Checkpoint;
use thiserror::Error;

/// Errors that can occur while reading or writing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Checkpoint checksum mismatch")]
    ChecksumMismatch,
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Trait for checkpoint backend implementations
///
/// Implementations must write a checkpoint atomically: a reader either sees the
/// previous checkpoint or the new one, never a partially written mix.
pub trait CheckpointStore: Send + Sync {
    /// Durably writes both records of a checkpoint
    fn snapshot(&self, checkpoint: &Checkpoint) -> CheckpointResult<()>;

    /// Reads the last checkpoint back
    ///
    /// Returns `Ok(None)` if no checkpoint has been written yet.
    fn load(&self) -> CheckpointResult<Option<Checkpoint>>;

    /// Removes any stored checkpoint
    fn clear(&self) -> CheckpointResult<()>;

    /// Reads the last checkpoint, treating absence or corruption as a cold start
    fn restore(&self) -> Checkpoint {
        match self.load() {
            Ok(Some(checkpoint)) => {
                tracing::info!(
                    "Restored checkpoint: {} visited, {} pending",
                    checkpoint.visited.len(),
                    checkpoint.frontier.len()
                );
                checkpoint
            }
            Ok(None) => {
                tracing::debug!("No checkpoint found, starting from empty state");
                Checkpoint::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable checkpoint: {}", e);
                Checkpoint::default()
            }
        }
    }
}
