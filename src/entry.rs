//! History entry types
//!
//! Defines the stored unit of captured content: kind tag, payload,
//! pin state, capture timestamp, and the derived projections used for
//! previews and substring search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Content kinds for history entries.
///
/// `Text`, `Url` and `Image` come from the clipboard capture path;
/// `File` is produced by the directory watcher variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Url,
    Image,
    File,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Url => "url",
            ContentKind::Image => "image",
            ContentKind::File => "file",
        }
    }
}

/// Kind-specific payload. Text, URLs and file paths are UTF-8 strings;
/// images are normalized PNG bytes (base64 in the persisted snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "data", rename_all = "lowercase")]
pub enum Payload {
    Text(String),
    Png(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Png(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Png(b) => b,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.as_bytes().len()
    }
}

/// Compute SHA-256 hash of payload bytes for fast dedup lookups
pub fn compute_content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A single history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub kind: ContentKind,
    pub payload: Payload,
    pub pinned: bool,
    pub captured_at: DateTime<Utc>,
    /// Dedup key component, derived from the payload. Not persisted;
    /// recomputed when a snapshot is loaded.
    #[serde(skip)]
    content_hash: String,
}

impl Entry {
    /// Create a new entry with a fresh id. Entries are only ever created
    /// by the store's add path, never by detectors directly.
    pub fn new(kind: ContentKind, payload: Payload, captured_at: DateTime<Utc>) -> Self {
        let content_hash = compute_content_hash(payload.as_bytes());
        Entry {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            pinned: false,
            captured_at,
            content_hash,
        }
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Recompute the derived hash after deserialization.
    pub(crate) fn rehash(&mut self) {
        self.content_hash = compute_content_hash(self.payload.as_bytes());
    }

    /// True when `other_kind`/`other_hash` identify the same content.
    pub fn matches_content(&self, other_kind: ContentKind, other_hash: &str) -> bool {
        self.kind == other_kind && self.content_hash == other_hash
    }

    /// Short display string for list rows.
    pub fn preview(&self) -> String {
        match (self.kind, &self.payload) {
            (ContentKind::Text, Payload::Text(s)) => s.chars().take(80).collect(),
            (ContentKind::Url, Payload::Text(s)) => s.clone(),
            (ContentKind::File, Payload::Text(s)) => file_name_of(s).to_string(),
            (ContentKind::Image, _) => "Image".to_string(),
            // A text kind with a binary payload cannot be constructed through
            // the classifier; fall back to the kind tag.
            (kind, _) => kind.as_str().to_string(),
        }
    }

    /// The string a search query is matched against, lowercased by the
    /// caller. Images use a fixed sentinel so typing "image" finds them.
    pub fn searchable_projection(&self) -> &str {
        match (self.kind, &self.payload) {
            (ContentKind::Text | ContentKind::Url, Payload::Text(s)) => s.as_str(),
            (ContentKind::File, Payload::Text(s)) => file_name_of(s),
            _ => "image",
        }
    }

    /// Case-insensitive substring match over the searchable projection.
    pub fn matches_query(&self, lowercased_query: &str) -> bool {
        self.searchable_projection()
            .to_lowercase()
            .contains(lowercased_query)
    }
}

fn file_name_of(path: &str) -> &str {
    std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_entry(s: &str) -> Entry {
        Entry::new(ContentKind::Text, Payload::Text(s.to_string()), Utc::now())
    }

    #[test]
    fn test_new_entry_defaults() {
        let entry = text_entry("hello");
        assert!(!entry.pinned);
        assert!(!entry.id.is_empty());
        assert_eq!(entry.content_hash().len(), 64, "SHA-256 is 64 hex chars");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = text_entry("same");
        let b = text_entry("same");
        assert_ne!(a.id, b.id);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_differs_by_payload() {
        let a = text_entry("one");
        let b = text_entry("two");
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_matches_content_requires_same_kind() {
        let text = text_entry("https://example.com");
        let url = Entry::new(
            ContentKind::Url,
            Payload::Text("https://example.com".to_string()),
            Utc::now(),
        );
        assert!(!text.matches_content(url.kind, url.content_hash()));
        assert!(url.matches_content(ContentKind::Url, url.content_hash()));
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let entry = text_entry(&"x".repeat(200));
        assert_eq!(entry.preview().chars().count(), 80);
    }

    #[test]
    fn test_preview_for_image_and_file() {
        let image = Entry::new(ContentKind::Image, Payload::Png(vec![1, 2, 3]), Utc::now());
        assert_eq!(image.preview(), "Image");

        let file = Entry::new(
            ContentKind::File,
            Payload::Text("/home/user/Downloads/report.pdf".to_string()),
            Utc::now(),
        );
        assert_eq!(file.preview(), "report.pdf");
    }

    #[test]
    fn test_searchable_projection_image_sentinel() {
        let image = Entry::new(ContentKind::Image, Payload::Png(vec![0u8; 8]), Utc::now());
        assert!(image.matches_query("image"));
        assert!(image.matches_query("mag"));
        assert!(!image.matches_query("photo"));
    }

    #[test]
    fn test_matches_query_case_insensitive() {
        let entry = text_entry("Hello World");
        assert!(entry.matches_query("hello"));
        assert!(entry.matches_query("o w"));
        assert!(!entry.matches_query("mars"));
    }

    #[test]
    fn test_serde_roundtrip_preserves_fields() {
        let mut entry = Entry::new(
            ContentKind::Image,
            Payload::Png(vec![137, 80, 78, 71, 0, 255]),
            Utc::now(),
        );
        entry.pinned = true;

        let json = serde_json::to_string(&entry).unwrap();
        let mut back: Entry = serde_json::from_str(&json).unwrap();
        back.rehash();

        assert_eq!(back.id, entry.id);
        assert_eq!(back.kind, entry.kind);
        assert_eq!(back.payload, entry.payload);
        assert!(back.pinned);
        assert_eq!(back.captured_at, entry.captured_at);
        assert_eq!(back.content_hash(), entry.content_hash());
    }

    #[test]
    fn test_png_payload_serializes_as_base64() {
        let entry = Entry::new(ContentKind::Image, Payload::Png(vec![0, 1, 2, 3]), Utc::now());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"encoding\":\"png\""));
        assert!(json.contains("AAECAw=="), "payload bytes should be base64: {json}");
    }
}
