//! Content classification
//!
//! Turns one captured event's candidate representations into exactly one
//! `(kind, payload)` pair, or nothing. The priority order is fixed:
//! a raster representation wins over any co-present text, an absolute
//! http(s) URL wins over plain text, and whitespace-only text is dropped.
//! The image-over-text rule resolves the common case where a copied link
//! or screenshot carries both representations.

use tracing::warn;

use crate::entry::{ContentKind, Payload};
use crate::image::{encode_normalized_png, RawImage};

/// Candidate representations of a single captured external event.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub text: Option<String>,
    pub image: Option<RawImage>,
}

impl Captured {
    pub fn text(text: impl Into<String>) -> Self {
        Captured {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(image: RawImage) -> Self {
        Captured {
            text: None,
            image: Some(image),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image.is_none()
    }
}

/// Classify a captured bundle into a typed payload.
///
/// Returns None on a classification miss (no representation yields
/// content) and on a malformed raster payload, which is dropped for this
/// event rather than falling back to a lower-priority representation.
pub fn classify(captured: &Captured, max_image_dimension: u32) -> Option<(ContentKind, Payload)> {
    if let Some(raw) = &captured.image {
        return match encode_normalized_png(raw, max_image_dimension) {
            Ok(png) => Some((ContentKind::Image, Payload::Png(png))),
            Err(e) => {
                warn!(error = %e, "Dropping malformed captured image");
                None
            }
        };
    }

    let text = captured.text.as_deref()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_http_url(trimmed) {
        return Some((ContentKind::Url, Payload::Text(trimmed.to_string())));
    }

    Some((ContentKind::Text, Payload::Text(text.to_string())))
}

/// Minimal absolute http/https URL check: a scheme prefix, at least one
/// host character, and no whitespace or control characters anywhere.
fn is_http_url(s: &str) -> bool {
    let rest = match s
        .strip_prefix("http://")
        .or_else(|| s.strip_prefix("https://"))
    {
        Some(rest) => rest,
        None => return false,
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty() && !s.chars().any(|c| c.is_whitespace() || c.is_control())
}
