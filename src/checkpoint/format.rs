//! On-disk checkpoint format
//!
//! A checkpoint file is a single JSON document carrying both records, a format
//! version, the time it was written, and a SHA-256 checksum over the records.

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current checkpoint format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    version: u32,
    saved_at: DateTime<Utc>,
    checksum: String,
    visited: Vec<String>,
    frontier: Vec<String>,
}

/// Serializes a checkpoint into its on-disk representation
///
/// The visited set is written sorted so identical state produces identical files.
pub fn encode(checkpoint: &Checkpoint, saved_at: DateTime<Utc>) -> CheckpointResult<Vec<u8>> {
    let mut visited: Vec<String> = checkpoint.visited.iter().cloned().collect();
    visited.sort();

    let file = CheckpointFile {
        version: FORMAT_VERSION,
        saved_at,
        checksum: checksum(&visited, &checkpoint.frontier),
        visited,
        frontier: checkpoint.frontier.clone(),
    };

    Ok(serde_json::to_vec_pretty(&file)?)
}

/// Parses and verifies an on-disk checkpoint
pub fn decode(bytes: &[u8]) -> CheckpointResult<Checkpoint> {
    let file: CheckpointFile = serde_json::from_slice(bytes)?;

    if file.version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion {
            found: file.version,
            expected: FORMAT_VERSION,
        });
    }

    if checksum(&file.visited, &file.frontier) != file.checksum {
        return Err(CheckpointError::ChecksumMismatch);
    }

    Ok(Checkpoint::new(
        file.visited.into_iter().collect(),
        file.frontier,
    ))
}

/// Computes the hex-encoded SHA-256 of both records
///
/// Each URL is terminated by a newline; the records are separated by a NUL so
/// moving a URL from one record to the other changes the digest.
fn checksum(visited: &[String], frontier: &[String]) -> String {
    let mut hasher = Sha256::new();
    for url in visited {
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"\0");
    for url in frontier {
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
