//! Clipboard monitoring
//!
//! Background polling loop over the injected clipboard seam. Each tick
//! samples a cheap change indicator (the platform's revision counter when
//! available) and only reads payloads on a genuine change; platforms
//! without a counter fall back to content fingerprinting. Self-triggered
//! changes are consumed through the shared [`FeedbackSuppressor`] before
//! any payload is read.

use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::classifier::Captured;
use crate::clipboard::SharedClipboard;
use crate::store::HistoryStore;
use crate::suppressor::FeedbackSuppressor;

/// Per-loop detector state: the last seen change indicator, and the last
/// content fingerprint for the no-indicator fallback.
#[derive(Debug, Default)]
pub(crate) struct TickState {
    last_revision: Option<u64>,
    last_fingerprint: Option<u64>,
}

/// Background clipboard change detector.
///
/// `stop()` is idempotent, safe without a prior `start()`, and returns
/// without blocking; an in-flight tick may finish, but no new tick is
/// scheduled afterwards. A stopped monitor stays stopped; create a new one
/// to resume.
pub struct ClipboardMonitor {
    store: Arc<HistoryStore>,
    clipboard: SharedClipboard,
    suppressor: Arc<FeedbackSuppressor>,
    poll_interval: Duration,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ClipboardMonitor {
    pub fn new(
        store: Arc<HistoryStore>,
        clipboard: SharedClipboard,
        poll_interval: Duration,
    ) -> Self {
        let suppressor = store.suppressor();
        ClipboardMonitor {
            store,
            clipboard,
            suppressor,
            poll_interval,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Spawn the polling thread. Calling start twice is a no-op.
    pub fn start(&mut self) {
        if self.thread.is_some() {
            debug!("Clipboard monitor already started, skipping");
            return;
        }

        let store = self.store.clone();
        let clipboard = self.clipboard.clone();
        let suppressor = self.suppressor.clone();
        let stop_flag = self.stop_flag.clone();
        let poll_interval = self.poll_interval;

        self.thread = Some(thread::spawn(move || {
            poll_loop(store, clipboard, suppressor, stop_flag, poll_interval);
        }));
    }

    /// Stop polling. Lock-free, idempotent, and safe even if `start` was
    /// never called.
    pub fn stop(&self) {
        if !self.stop_flag.swap(true, Ordering::Relaxed) {
            info!("Clipboard monitoring stopped");
        }
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    store: Arc<HistoryStore>,
    clipboard: SharedClipboard,
    suppressor: Arc<FeedbackSuppressor>,
    stop_flag: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    let has_revision_counter = clipboard.lock().revision().is_some();
    info!(
        poll_interval_ms = poll_interval.as_millis() as u64,
        has_revision_counter, "Clipboard monitor started"
    );

    let mut state = TickState::default();
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            info!("Clipboard monitor stopping");
            break;
        }

        let start = Instant::now();
        tick(&mut state, &clipboard, &suppressor, &store);

        let elapsed = start.elapsed();
        if elapsed < poll_interval {
            thread::sleep(poll_interval - elapsed);
        }
    }
}

/// One detector pass: Idle -> Polling -> (Changed | Unchanged) -> Idle.
///
/// A failed read is dropped for this tick; the caller's loop carries on.
pub(crate) fn tick(
    state: &mut TickState,
    clipboard: &SharedClipboard,
    suppressor: &FeedbackSuppressor,
    store: &HistoryStore,
) {
    let revision = clipboard.lock().revision();
    match revision {
        Some(revision) => {
            if state.last_revision == Some(revision) {
                return;
            }
            // Record the indicator before anything else, even if the
            // content ends up discarded, so the same change is not
            // re-processed on the next tick.
            state.last_revision = Some(revision);

            if suppressor.should_suppress() {
                debug!(revision, "Suppressed self-triggered clipboard change");
                return;
            }

            let captured = match clipboard.lock().read() {
                Ok(captured) => captured,
                Err(e) => {
                    warn!(error = %e, "Clipboard read failed, dropping tick");
                    return;
                }
            };
            if captured.is_empty() {
                return;
            }
            let _ = store.notify_captured(&captured, Utc::now());
        }
        None => {
            // No cheap indicator on this platform: read and compare a
            // content fingerprint instead.
            let captured = match clipboard.lock().read() {
                Ok(captured) => captured,
                Err(e) => {
                    warn!(error = %e, "Clipboard read failed, dropping tick");
                    return;
                }
            };

            let fingerprint = fingerprint_of(&captured);
            if fingerprint == state.last_fingerprint {
                return;
            }
            state.last_fingerprint = fingerprint;

            if fingerprint.is_none() {
                // Clipboard was cleared; nothing to capture.
                return;
            }
            if suppressor.should_suppress() {
                debug!("Suppressed self-triggered clipboard change");
                return;
            }
            let _ = store.notify_captured(&captured, Utc::now());
        }
    }
}

/// Cheap content fingerprint: full text plus image dimensions and a 1 KiB
/// pixel sample. None for an empty capture.
fn fingerprint_of(captured: &Captured) -> Option<u64> {
    if captured.is_empty() {
        return None;
    }

    let mut hasher = DefaultHasher::new();
    if let Some(text) = &captured.text {
        text.hash(&mut hasher);
    }
    if let Some(image) = &captured.image {
        image.width.hash(&mut hasher);
        image.height.hash(&mut hasher);
        let sample = 1024.min(image.rgba.len());
        image.rgba[..sample].hash(&mut hasher);
    }
    Some(hasher.finish())
}
