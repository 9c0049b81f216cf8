//! History store
//!
//! In-memory ordered collection of captured entries with content dedup,
//! pin-aware eviction, search/filter views, and synchronous snapshot
//! persistence after every mutation. Entries live newest-first; display
//! order additionally floats pinned entries to the top.
//!
//! All operations are safe to call from the detector thread while the
//! presentation layer reads views from another thread; one lock around
//! the collection is plenty at a few dozen entries.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::classifier::{classify, Captured};
use crate::clipboard::{SharedClipboard, WriteRequest};
use crate::config::Config;
use crate::entry::{compute_content_hash, ContentKind, Entry, Payload};
use crate::error::ResultExt;
use crate::image::decode_png;
use crate::persist::PersistenceLayer;
use crate::suppressor::FeedbackSuppressor;

/// Change notification sent to subscribed presentation layers after any
/// mutation, so they can re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(String),
    /// An existing entry was bumped to the front (duplicate capture or
    /// copy-out).
    Refreshed(String),
    Pinned(String),
    Unpinned(String),
    Deleted(String),
    Evicted(String),
    Cleared,
    Pruned(usize),
}

struct StoreInner {
    entries: Vec<Entry>,
    subscribers: Vec<Sender<StoreEvent>>,
}

pub struct HistoryStore {
    inner: Mutex<StoreInner>,
    persistence: PersistenceLayer,
    suppressor: Arc<FeedbackSuppressor>,
    clipboard: SharedClipboard,
    max_entries: usize,
    max_image_dimension: u32,
}

impl HistoryStore {
    /// Create a store, loading any persisted history from disk.
    pub fn new(
        config: &Config,
        clipboard: SharedClipboard,
        suppressor: Arc<FeedbackSuppressor>,
    ) -> Self {
        let persistence = PersistenceLayer::new(
            config
                .storage_path
                .clone()
                .unwrap_or_else(PersistenceLayer::default_path),
        );
        let entries = persistence.load();

        HistoryStore {
            inner: Mutex::new(StoreInner {
                entries,
                subscribers: Vec::new(),
            }),
            persistence,
            suppressor,
            clipboard,
            max_entries: config.max_entries,
            max_image_dimension: config.max_image_dimension,
        }
    }

    /// The suppressor shared with the detector.
    pub fn suppressor(&self) -> Arc<FeedbackSuppressor> {
        self.suppressor.clone()
    }

    /// Subscribe to change notifications. Dropped receivers are pruned on
    /// the next emit.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    /// Classify a captured representation bundle and add the result.
    /// The inbound seam for both detector variants and for event-driven
    /// capture collaborators. Returns None on a classification miss.
    pub fn notify_captured(
        &self,
        captured: &Captured,
        captured_at: DateTime<Utc>,
    ) -> Option<String> {
        let (kind, payload) = classify(captured, self.max_image_dimension)?;
        Some(self.add(kind, payload, captured_at))
    }

    /// Insert captured content at the front of the history.
    ///
    /// A payload identical to an existing entry of the same kind refreshes
    /// that entry's recency (same id, pin state kept) instead of inserting
    /// a duplicate. Eviction then drops least-recently-inserted unpinned
    /// entries until the bound holds, and the snapshot is persisted.
    pub fn add(&self, kind: ContentKind, payload: Payload, captured_at: DateTime<Utc>) -> String {
        let content_hash = compute_content_hash(payload.as_bytes());
        let mut inner = self.inner.lock();

        if let Some(pos) = inner
            .entries
            .iter()
            .position(|e| e.matches_content(kind, &content_hash))
        {
            let mut existing = inner.entries.remove(pos);
            existing.captured_at = captured_at;
            let id = existing.id.clone();
            inner.entries.insert(0, existing);

            self.persistence.save(&inner.entries).warn_on_err();
            Self::emit(&mut inner, StoreEvent::Refreshed(id.clone()));
            debug!(id = %id, kind = kind.as_str(), "Refreshed existing entry");
            return id;
        }

        let entry = Entry::new(kind, payload, captured_at);
        let id = entry.id.clone();
        inner.entries.insert(0, entry);
        debug!(id = %id, kind = kind.as_str(), "Added entry");

        while inner.entries.len() > self.max_entries {
            match inner.entries.iter().rposition(|e| !e.pinned) {
                Some(pos) => {
                    let evicted = inner.entries.remove(pos);
                    debug!(id = %evicted.id, "Evicted oldest unpinned entry");
                    Self::emit(&mut inner, StoreEvent::Evicted(evicted.id));
                }
                None => {
                    warn!(
                        size = inner.entries.len(),
                        max = self.max_entries,
                        "All entries pinned, size bound temporarily exceeded"
                    );
                    break;
                }
            }
        }

        self.persistence.save(&inner.entries).warn_on_err();
        Self::emit(&mut inner, StoreEvent::Added(id.clone()));
        id
    }

    /// Pin an entry so eviction and clear-all skip it.
    /// Returns false (a no-op, not an error) when the id is unknown.
    pub fn pin(&self, id: &str) -> bool {
        self.set_pinned(id, true)
    }

    pub fn unpin(&self, id: &str) -> bool {
        self.set_pinned(id, false)
    }

    fn set_pinned(&self, id: &str, pinned: bool) -> bool {
        let mut inner = self.inner.lock();
        let Some(pos) = inner.entries.iter().position(|e| e.id == id) else {
            debug!(id = %id, "Pin toggle for unknown entry is a no-op");
            return false;
        };
        if inner.entries[pos].pinned == pinned {
            return true;
        }
        inner.entries[pos].pinned = pinned;

        self.persistence.save(&inner.entries).warn_on_err();
        let event = if pinned {
            StoreEvent::Pinned(id.to_string())
        } else {
            StoreEvent::Unpinned(id.to_string())
        };
        Self::emit(&mut inner, event);
        info!(id = %id, pinned, "Toggled pin");
        true
    }

    /// Remove an entry regardless of pin state.
    /// Returns false when the id is unknown.
    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != id);
        if inner.entries.len() == before {
            debug!(id = %id, "Delete for unknown entry is a no-op");
            return false;
        }

        self.persistence.save(&inner.entries).warn_on_err();
        Self::emit(&mut inner, StoreEvent::Deleted(id.to_string()));
        info!(id = %id, "Deleted entry");
        true
    }

    /// Remove all unpinned entries; pinned entries survive in their prior
    /// relative order.
    pub fn clear_all(&self) {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.pinned);

        self.persistence.save(&inner.entries).warn_on_err();
        Self::emit(&mut inner, StoreEvent::Cleared);
        info!(
            removed = before - inner.entries.len(),
            kept = inner.entries.len(),
            "Cleared history"
        );
    }

    /// Age-based retention for the watcher-style variants: remove unpinned
    /// entries captured more than `age` ago. Returns the number removed.
    pub fn prune_older_than(&self, age: Duration) -> usize {
        let age = match chrono::Duration::from_std(age) {
            Ok(age) => age,
            // An age beyond representable time can't match anything.
            Err(_) => return 0,
        };
        let cutoff = match Utc::now().checked_sub_signed(age) {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.pinned || e.captured_at >= cutoff);
        let removed = before - inner.entries.len();

        if removed > 0 {
            self.persistence.save(&inner.entries).warn_on_err();
            Self::emit(&mut inner, StoreEvent::Pruned(removed));
            info!(removed, "Pruned old entries");
        }
        removed
    }

    /// Write an entry's payload back to the external resource in a
    /// kind-appropriate representation, arming the feedback suppressor
    /// strictly beforehand. An unknown id or a failed write is logged and
    /// reported as `false`, never as a hard error.
    pub fn copy_out(&self, id: &str) -> bool {
        let (kind, payload) = {
            let inner = self.inner.lock();
            match inner.entries.iter().find(|e| e.id == id) {
                Some(entry) => (entry.kind, entry.payload.clone()),
                None => {
                    warn!(id = %id, "Copy-out for unknown entry");
                    return false;
                }
            }
        };

        // Decode before arming so the armed window is only as wide as the
        // write itself.
        let decoded_image;
        let request = match (kind, &payload) {
            (ContentKind::Url, Payload::Text(text)) => WriteRequest::Url(text),
            (ContentKind::Text | ContentKind::File, Payload::Text(text)) => {
                WriteRequest::Text(text)
            }
            (ContentKind::Image, Payload::Png(bytes)) => match decode_png(bytes) {
                Some(raw) => {
                    decoded_image = raw;
                    WriteRequest::Image(&decoded_image)
                }
                None => {
                    warn!(id = %id, "Stored image payload failed to decode");
                    return false;
                }
            },
            _ => {
                warn!(id = %id, kind = kind.as_str(), "Entry payload does not match its kind");
                return false;
            }
        };

        self.suppressor.arm();
        let written = self.clipboard.lock().write(request);

        match written {
            Ok(()) => {
                let mut inner = self.inner.lock();
                if let Some(pos) = inner.entries.iter().position(|e| e.id == id) {
                    let mut entry = inner.entries.remove(pos);
                    entry.captured_at = Utc::now();
                    inner.entries.insert(0, entry);
                    self.persistence.save(&inner.entries).warn_on_err();
                    Self::emit(&mut inner, StoreEvent::Refreshed(id.to_string()));
                }
                info!(id = %id, kind = kind.as_str(), "Copied entry to clipboard");
                true
            }
            Err(e) => {
                // Nothing hit the clipboard; consume the armed latch so the
                // next genuine external change is not swallowed.
                self.suppressor.disarm();
                warn!(id = %id, error = %e, "Clipboard write failed");
                false
            }
        }
    }

    /// Point-in-time view: pinned entries first (relative recency kept),
    /// then unpinned by recency, filtered case-insensitively against each
    /// entry's searchable projection when `query` is non-empty.
    pub fn view(&self, query: &str) -> Vec<Entry> {
        let inner = self.inner.lock();
        let query = query.trim().to_lowercase();
        let matches = |entry: &&Entry| query.is_empty() || entry.matches_query(&query);

        let pinned = inner.entries.iter().filter(|e| e.pinned).filter(&matches);
        let unpinned = inner.entries.iter().filter(|e| !e.pinned).filter(&matches);
        pinned.chain(unpinned).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    fn emit(inner: &mut StoreInner, event: StoreEvent) {
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
