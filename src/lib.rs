//! clipkeep - a content history engine
//!
//! The recurring core of a family of menu-bar capture utilities: an
//! external-change detector feeds a bounded, deduplicated, pin-aware
//! history store with durable persistence and feedback-loop prevention.
//!
//! The pipeline is detect -> classify -> dedupe -> store -> evict ->
//! persist. Two detector variants feed the same store: a clipboard
//! polling monitor and a filesystem directory watcher. Presentation
//! layers consume ordered, filterable views and receive change
//! notifications; they write content back out through `copy_out`, which
//! arms the feedback suppressor so the engine never re-captures its own
//! writes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use clipkeep::{
//!     clipboard, ClipboardMonitor, Config, FeedbackSuppressor, HistoryStore, SystemClipboard,
//! };
//!
//! let config = Config::default();
//! let clipboard = clipboard::shared(SystemClipboard::new());
//! let store = Arc::new(HistoryStore::new(
//!     &config,
//!     clipboard.clone(),
//!     Arc::new(FeedbackSuppressor::new()),
//! ));
//!
//! let mut monitor = ClipboardMonitor::new(store.clone(), clipboard, config.poll_interval);
//! monitor.start();
//!
//! let everything = store.view("");
//! let only_links = store.view("https");
//! # let _ = (everything, only_links);
//! monitor.stop();
//! ```

pub mod classifier;
pub mod clipboard;
pub mod config;
pub mod entry;
pub mod error;
pub mod image;
pub mod logging;
pub mod monitor;
pub mod persist;
pub mod store;
pub mod suppressor;
pub mod watcher;


pub use classifier::{classify, Captured};
pub use clipboard::{Clipboard, MemoryClipboard, SharedClipboard, SystemClipboard, WriteRequest};
pub use config::Config;
pub use entry::{ContentKind, Entry, Payload};
pub use error::{HistoryError, ResultExt};
pub use crate::image::RawImage;
pub use monitor::ClipboardMonitor;
pub use persist::PersistenceLayer;
pub use store::{HistoryStore, StoreEvent};
pub use suppressor::FeedbackSuppressor;
pub use watcher::DirectoryWatcher;
