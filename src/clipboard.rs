//! Clipboard seam
//!
//! The engine never touches the process-wide system clipboard directly;
//! it goes through the [`Clipboard`] trait so the detector and the store
//! can be exercised against an in-memory fake. The production
//! implementation is backed by `arboard`, with an NSPasteboard changeCount
//! fast path on macOS for cheap revision polling.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

use crate::classifier::Captured;
use crate::image::RawImage;

/// Kind-appropriate representation handed to the external resource on
/// write-back. `Url` carries the string twice over the wire: as plain text
/// and as an HTML anchor alternate, so downstream consumers can use either.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest<'a> {
    Text(&'a str),
    Url(&'a str),
    Image(&'a RawImage),
}

/// Injected interface over the shared mutable external resource.
pub trait Clipboard: Send {
    /// Read the current candidate representations.
    fn read(&mut self) -> Result<Captured>;

    /// Replace the resource's content with a kind-specific representation.
    fn write(&mut self, request: WriteRequest<'_>) -> Result<()>;

    /// Cheap monotonic change indicator, when the platform offers one.
    /// `None` means the caller must fall back to content-based detection.
    fn revision(&mut self) -> Option<u64>;
}

/// Shared handle used by the monitor thread and the store's write-back path.
pub type SharedClipboard = Arc<Mutex<dyn Clipboard>>;

pub fn shared(clipboard: impl Clipboard + 'static) -> SharedClipboard {
    Arc::new(Mutex::new(clipboard))
}

/// System clipboard backed by `arboard`.
///
/// A fresh `arboard::Clipboard` is opened per operation; the handles are
/// cheap and keeping one across threads is not portable.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        SystemClipboard
    }
}

impl Clipboard for SystemClipboard {
    fn read(&mut self) -> Result<Captured> {
        let mut clipboard =
            arboard::Clipboard::new().context("Failed to open system clipboard")?;

        let text = clipboard
            .get_text()
            .ok()
            .filter(|text| !text.is_empty());

        let image = clipboard.get_image().ok().map(|data| RawImage {
            width: data.width as u32,
            height: data.height as u32,
            rgba: data.bytes.into_owned(),
        });

        Ok(Captured { text, image })
    }

    fn write(&mut self, request: WriteRequest<'_>) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().context("Failed to open system clipboard")?;

        match request {
            WriteRequest::Text(text) => clipboard
                .set_text(text)
                .context("Failed to set clipboard text")?,
            WriteRequest::Url(url) => {
                let anchor = format!("<a href=\"{url}\">{url}</a>");
                clipboard
                    .set_html(anchor.as_str(), Some(url))
                    .context("Failed to set clipboard url")?;
            }
            WriteRequest::Image(raw) => {
                let data = arboard::ImageData {
                    width: raw.width as usize,
                    height: raw.height as usize,
                    bytes: Cow::Borrowed(raw.rgba.as_slice()),
                };
                clipboard
                    .set_image(data)
                    .context("Failed to set clipboard image")?;
            }
        }
        Ok(())
    }

    fn revision(&mut self) -> Option<u64> {
        pasteboard_change_count().map(|count| count as u64)
    }
}

/// Get the current NSPasteboard changeCount.
///
/// A cheap integer read that increments on every clipboard mutation, so
/// consecutive values can be compared without reading payloads. Returns
/// None on other platforms.
#[cfg(target_os = "macos")]
fn pasteboard_change_count() -> Option<i64> {
    use cocoa::appkit::NSPasteboard;
    use cocoa::base::nil;
    use objc::runtime::Object;
    use objc::{sel, sel_impl};

    unsafe {
        let pasteboard: *mut Object = NSPasteboard::generalPasteboard(nil);
        if pasteboard.is_null() {
            return None;
        }
        let change_count: i64 = objc::msg_send![pasteboard, changeCount];
        Some(change_count)
    }
}

#[cfg(not(target_os = "macos"))]
fn pasteboard_change_count() -> Option<i64> {
    None
}

/// In-memory clipboard for tests and headless use.
///
/// Tracks a revision counter the way NSPasteboard does: every mutation,
/// whether through [`Clipboard::write`] or the test-side `put_*` helpers,
/// bumps it.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
    image: Option<RawImage>,
    revision: u64,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an external writer placing text on the clipboard.
    pub fn put_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
        self.image = None;
        self.revision += 1;
    }

    /// Simulate an external writer placing an image on the clipboard.
    pub fn put_image(&mut self, image: RawImage) {
        self.image = Some(image);
        self.text = None;
        self.revision += 1;
    }

    pub fn current_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn current_revision(&self) -> u64 {
        self.revision
    }
}

impl Clipboard for MemoryClipboard {
    fn read(&mut self) -> Result<Captured> {
        Ok(Captured {
            text: self.text.clone(),
            image: self.image.clone(),
        })
    }

    fn write(&mut self, request: WriteRequest<'_>) -> Result<()> {
        match request {
            WriteRequest::Text(text) | WriteRequest::Url(text) => {
                self.text = Some(text.to_string());
                self.image = None;
            }
            WriteRequest::Image(raw) => {
                self.image = Some(raw.clone());
                self.text = None;
            }
        }
        self.revision += 1;
        debug!(revision = self.revision, "Memory clipboard written");
        Ok(())
    }

    fn revision(&mut self) -> Option<u64> {
        Some(self.revision)
    }
}
