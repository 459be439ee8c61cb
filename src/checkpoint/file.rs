//! File-backed checkpoint store

use crate::checkpoint::format::{decode, encode};
use crate::checkpoint::{Checkpoint, CheckpointResult, CheckpointStore};
use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Checkpoint store that keeps the latest checkpoint in a single JSON file
///
/// Writes go to `<path>.tmp` first and are then renamed over `<path>`, so a
/// crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store writing to the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("checkpoint"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Flushes the directory entry so a completed rename survives a crash
    #[cfg(unix)]
    fn sync_parent(&self) -> std::io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()
    }

    // Directories cannot be opened as files here
    #[cfg(not(unix))]
    fn sync_parent(&self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn snapshot(&self, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        let bytes = encode(checkpoint, Utc::now())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        self.sync_parent()?;

        tracing::debug!(
            "Wrote checkpoint to {} ({} visited, {} pending)",
            self.path.display(),
            checkpoint.visited.len(),
            checkpoint.frontier.len()
        );
        Ok(())
    }

    fn load(&self) -> CheckpointResult<Option<Checkpoint>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        decode(&bytes).map(Some)
    }

    fn clear(&self) -> CheckpointResult<()> {
        for path in [self.path.clone(), self.temp_path()] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointError;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn create_temp_store() -> (TempDir, FileCheckpointStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(temp_dir.path().join("checkpoint.json"));
        (temp_dir, store)
    }

    fn sample() -> Checkpoint {
        Checkpoint::new(
            HashSet::from(["http://example.com/".to_string()]),
            vec![
                "http://example.com/a".to_string(),
                "https://other.com/b".to_string(),
            ],
        )
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let (_temp_dir, store) = create_temp_store();
        assert!(store.load().unwrap().is_none());
        assert!(store.restore().is_empty());
    }

    #[test]
    fn test_snapshot_then_restore() {
        let (_temp_dir, store) = create_temp_store();
        store.snapshot(&sample()).unwrap();

        let restored = store.restore();
        assert_eq!(restored, sample());
    }

    #[test]
    fn test_snapshot_replaces_previous() {
        let (_temp_dir, store) = create_temp_store();
        store.snapshot(&sample()).unwrap();

        let newer = Checkpoint::new(
            HashSet::from([
                "http://example.com/".to_string(),
                "http://example.com/a".to_string(),
            ]),
            vec!["https://other.com/b".to_string()],
        );
        store.snapshot(&newer).unwrap();

        assert_eq!(store.restore(), newer);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let (temp_dir, store) = create_temp_store();
        store.snapshot(&sample()).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("checkpoint.json")]);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(temp_dir.path().join("nested/dir/state.json"));
        store.snapshot(&sample()).unwrap();
        assert_eq!(store.restore(), sample());
    }

    #[test]
    fn test_sync_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = FileCheckpointStore::new(temp_dir.path().join("nested/state.json"));
        nested.snapshot(&sample()).unwrap();
        nested.sync_parent().unwrap();

        // A bare file name lives in the working directory
        let bare = FileCheckpointStore::new("state.json");
        bare.sync_parent().unwrap();
    }

    #[test]
    fn test_corrupt_file_restores_empty() {
        let (_temp_dir, store) = create_temp_store();
        fs::write(store.path(), b"{\"version\": 1, \"visited\": [").unwrap();

        assert!(matches!(
            store.load(),
            Err(CheckpointError::Serialization(_))
        ));
        assert!(store.restore().is_empty());
    }

    #[test]
    fn test_stale_temp_file_ignored() {
        let (_temp_dir, store) = create_temp_store();
        store.snapshot(&sample()).unwrap();

        // A crash between create and rename leaves a partial temp file behind
        fs::write(store.temp_path(), b"partial").unwrap();

        assert_eq!(store.restore(), sample());
    }

    #[test]
    fn test_clear_removes_checkpoint() {
        let (_temp_dir, store) = create_temp_store();
        store.snapshot(&sample()).unwrap();
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }
}
