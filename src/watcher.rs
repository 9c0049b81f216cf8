//! Directory watching
//!
//! The filesystem variant of the change detector: instead of polling a
//! revision counter, it subscribes to OS change events for one directory
//! and diffs the listing against a known-file snapshot, so only genuinely
//! new names are announced. New files become `File` entries in the same
//! history store the clipboard path feeds.

use anyhow::{Context, Result};
use chrono::Utc;
use notify::{recommended_watcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::entry::{ContentKind, Payload};
use crate::store::HistoryStore;

/// Suffixes browsers and download managers use for in-progress writes
const PARTIAL_WRITE_SUFFIXES: &[&str] = &[".crdownload", ".download", ".part", ".tmp"];

/// How often the watch loop wakes up to check the stop flag
const STOP_POLL_MS: u64 = 200;

/// Watches a directory and adds newly appearing files to the history.
///
/// `stop()` is idempotent and safe without `start()`; the underlying OS
/// watch is released when the loop observes the flag and exits.
pub struct DirectoryWatcher {
    directory: PathBuf,
    store: Arc<HistoryStore>,
    settle_delay: Duration,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    pub fn new(
        directory: impl Into<PathBuf>,
        store: Arc<HistoryStore>,
        settle_delay: Duration,
    ) -> Self {
        DirectoryWatcher {
            directory: directory.into(),
            store,
            settle_delay,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Snapshot the current directory contents and start watching.
    /// Pre-existing files are never announced. Calling start twice is a
    /// no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            debug!("Directory watcher already started, skipping");
            return Ok(());
        }

        let known = list_file_names(&self.directory).with_context(|| {
            format!("Failed to list watched directory {}", self.directory.display())
        })?;

        let (watch_tx, watch_rx) = channel();
        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = watch_tx.send(res);
        })
        .context("Failed to create filesystem watcher")?;
        watcher
            .watch(&self.directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", self.directory.display()))?;

        info!(
            path = %self.directory.display(),
            known_files = known.len(),
            "Directory watcher started"
        );

        let directory = self.directory.clone();
        let store = self.store.clone();
        let settle_delay = self.settle_delay;
        let stop_flag = self.stop_flag.clone();

        self.thread = Some(thread::spawn(move || {
            // The watcher is moved in so the OS watch lives exactly as
            // long as the loop and is released when it exits.
            watch_loop(watcher, watch_rx, directory, known, store, settle_delay, stop_flag);
        }));
        Ok(())
    }

    /// Stop watching. Idempotent, safe without a prior `start()`.
    pub fn stop(&self) {
        if !self.stop_flag.swap(true, Ordering::Relaxed) {
            info!(path = %self.directory.display(), "Directory watcher stopped");
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_loop(
    _watcher: impl Watcher,
    watch_rx: Receiver<notify::Result<notify::Event>>,
    directory: PathBuf,
    mut known: HashSet<String>,
    store: Arc<HistoryStore>,
    settle_delay: Duration,
    stop_flag: Arc<AtomicBool>,
) {
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }

        match watch_rx.recv_timeout(Duration::from_millis(STOP_POLL_MS)) {
            Ok(Ok(event)) => {
                let is_relevant = matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                );
                if !is_relevant {
                    continue;
                }

                // Give the writer a moment to finish flushing before the
                // file is read downstream.
                if !settle_delay.is_zero() {
                    thread::sleep(settle_delay);
                }
                announce_new_files(&directory, &mut known, &store);
            }
            Ok(Err(e)) => {
                warn!(error = %e, path = %directory.display(), "File watcher error");
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!(path = %directory.display(), "Directory watcher shutting down");
}

/// Re-list the directory, diff against the snapshot, and add each new
/// non-excluded file to the history.
fn announce_new_files(directory: &Path, known: &mut HashSet<String>, store: &HistoryStore) {
    let current = match list_file_names(directory) {
        Ok(current) => current,
        Err(e) => {
            warn!(error = %e, path = %directory.display(), "Failed to re-list watched directory");
            return;
        }
    };

    let new_names: Vec<String> = current.difference(known).cloned().collect();
    *known = current;

    for name in new_names {
        if is_excluded(&name) {
            debug!(name = %name, "Skipping excluded file");
            continue;
        }
        let path = directory.join(&name);
        let id = store.add(
            ContentKind::File,
            Payload::Text(path.display().to_string()),
            Utc::now(),
        );
        debug!(id = %id, name = %name, "Added new file to history");
    }
}

/// Hidden files and partial-write artifacts are never announced.
fn is_excluded(name: &str) -> bool {
    name.starts_with('.')
        || PARTIAL_WRITE_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
}

fn list_file_names(directory: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for dir_entry in std::fs::read_dir(directory)? {
        let dir_entry = dir_entry?;
        if let Ok(name) = dir_entry.file_name().into_string() {
            names.insert(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{shared, MemoryClipboard};
    use crate::config::Config;
    use crate::suppressor::FeedbackSuppressor;
    use std::time::Instant;
    use tempfile::tempdir;

    #[test]
    fn test_is_excluded() {
        assert!(is_excluded(".DS_Store"));
        assert!(is_excluded(".hidden"));
        assert!(is_excluded("video.mp4.crdownload"));
        assert!(is_excluded("archive.zip.download"));
        assert!(is_excluded("disk.iso.part"));
        assert!(is_excluded("staging.tmp"));

        assert!(!is_excluded("report.pdf"));
        assert!(!is_excluded("photo.png"));
        assert!(!is_excluded("partly-named.txt"));
    }

    fn make_store(storage_dir: &Path) -> Arc<HistoryStore> {
        let config = Config::with_storage_path(storage_dir.join("history.json"));
        Arc::new(HistoryStore::new(
            &config,
            shared(MemoryClipboard::new()),
            Arc::new(FeedbackSuppressor::new()),
        ))
    }

    fn wait_for_len(store: &HistoryStore, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if store.len() == expected {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        store.len() == expected
    }

    #[test]
    fn test_new_files_are_announced_and_existing_are_not() {
        let watched = tempdir().unwrap();
        let storage = tempdir().unwrap();
        std::fs::write(watched.path().join("existing.txt"), b"old").unwrap();

        let store = make_store(storage.path());
        let mut watcher =
            DirectoryWatcher::new(watched.path(), store.clone(), Duration::ZERO);
        watcher.start().unwrap();

        std::fs::write(watched.path().join("fresh.txt"), b"new").unwrap();

        assert!(wait_for_len(&store, 1), "new file should be announced");
        let view = store.view("");
        assert_eq!(view[0].kind, ContentKind::File);
        assert!(view[0]
            .payload
            .as_text()
            .unwrap()
            .ends_with("fresh.txt"));
        assert!(
            !view.iter().any(|e| {
                e.payload
                    .as_text()
                    .map(|p| p.ends_with("existing.txt"))
                    .unwrap_or(false)
            }),
            "pre-existing files must not be announced"
        );

        watcher.stop();
    }

    #[test]
    fn test_excluded_files_are_ignored() {
        let watched = tempdir().unwrap();
        let storage = tempdir().unwrap();

        let store = make_store(storage.path());
        let mut watcher =
            DirectoryWatcher::new(watched.path(), store.clone(), Duration::ZERO);
        watcher.start().unwrap();

        std::fs::write(watched.path().join("movie.mkv.part"), b"partial").unwrap();
        std::fs::write(watched.path().join(".metadata"), b"hidden").unwrap();
        std::fs::write(watched.path().join("kept.txt"), b"visible").unwrap();

        assert!(wait_for_len(&store, 1), "only the visible file counts");
        assert!(store.view("")[0]
            .payload
            .as_text()
            .unwrap()
            .ends_with("kept.txt"));

        watcher.stop();
    }

    #[test]
    fn test_file_search_uses_file_name() {
        let watched = tempdir().unwrap();
        let storage = tempdir().unwrap();

        let store = make_store(storage.path());
        let mut watcher =
            DirectoryWatcher::new(watched.path(), store.clone(), Duration::ZERO);
        watcher.start().unwrap();

        std::fs::write(watched.path().join("Quarterly-Report.pdf"), b"pdf").unwrap();
        assert!(wait_for_len(&store, 1));

        assert_eq!(store.view("quarterly").len(), 1);
        assert_eq!(store.view("nothing-like-this").len(), 0);

        watcher.stop();
    }

    #[test]
    fn test_start_on_missing_directory_fails() {
        let storage = tempdir().unwrap();
        let store = make_store(storage.path());
        let mut watcher = DirectoryWatcher::new(
            storage.path().join("does-not-exist"),
            store,
            Duration::ZERO,
        );
        assert!(watcher.start().is_err());
    }

    #[test]
    fn test_stop_without_start_is_safe() {
        let storage = tempdir().unwrap();
        let store = make_store(storage.path());
        let watcher = DirectoryWatcher::new(storage.path(), store, Duration::ZERO);
        watcher.stop();
        watcher.stop();
    }
}
