//! Snapshot persistence
//!
//! The full entry list is serialized to one version-tagged JSON file and
//! written atomically (write temp + rename) so a crash mid-write never
//! corrupts the previous valid snapshot. Loading is deliberately lossy:
//! a missing, unreadable, or unparsable file yields an empty history,
//! because losing history beats failing to start.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::entry::Entry;
use crate::error::{HistoryError, Result};

/// Bump when the snapshot schema changes incompatibly. Unknown future
/// versions are treated as unreadable (empty history), not as errors.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<Entry>,
}

/// Borrowed twin of [`Snapshot`] so saving doesn't clone the entry list.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    entries: &'a [Entry],
}

#[derive(Debug, Clone)]
pub struct PersistenceLayer {
    file_path: PathBuf,
}

impl PersistenceLayer {
    pub fn new(file_path: PathBuf) -> Self {
        PersistenceLayer { file_path }
    }

    /// Default snapshot location: `<data_dir>/clipkeep/history.json`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("clipkeep")
            .join("history.json")
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Serialize the entry list and write it atomically.
    pub fn save(&self, entries: &[Entry]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HistoryError::SnapshotIo {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let json = serde_json::to_string(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            entries,
        })?;

        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, &json).map_err(|source| HistoryError::SnapshotIo {
            path: temp_path.display().to_string(),
            source,
        })?;

        std::fs::rename(&temp_path, &self.file_path).map_err(|source| {
            HistoryError::SnapshotIo {
                path: self.file_path.display().to_string(),
                source,
            }
        })?;

        debug!(
            path = %self.file_path.display(),
            entry_count = entries.len(),
            bytes = json.len(),
            "Saved history snapshot (atomic)"
        );
        Ok(())
    }

    /// Load the persisted entry list. Any failure yields an empty list.
    pub fn load(&self) -> Vec<Entry> {
        if !self.file_path.exists() {
            info!(path = %self.file_path.display(), "No history snapshot, starting fresh");
            return Vec::new();
        }

        let content = match std::fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.file_path.display(), error = %e, "Unreadable history snapshot, starting fresh");
                return Vec::new();
            }
        };

        let snapshot: Snapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.file_path.display(), error = %e, "Corrupt history snapshot, starting fresh");
                return Vec::new();
            }
        };

        if snapshot.version > SNAPSHOT_VERSION {
            warn!(
                found = snapshot.version,
                supported = SNAPSHOT_VERSION,
                "History snapshot from a newer version, starting fresh"
            );
            return Vec::new();
        }

        let mut entries = snapshot.entries;
        for entry in &mut entries {
            entry.rehash();
        }

        info!(
            path = %self.file_path.display(),
            entry_count = entries.len(),
            "Loaded history snapshot"
        );
        entries
    }
}
