//! Engine configuration
//!
//! Bounds and intervals for the history store and both detector variants.
//! Defaults match the behavior the menu-bar clients shipped with: twenty
//! entries, half-second polling, half-second settle delay, 512 px images.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum entries kept in history before unpinned eviction kicks in
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// Polling interval for clipboard changes
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Longest allowed image side; larger captures are downscaled
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 512;

/// Delay before reading a newly appeared file, to let the writer flush
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_entries: usize,
    pub poll_interval: Duration,
    pub max_image_dimension: u32,
    pub settle_delay: Duration,
    /// Snapshot file override. When None the store persists to
    /// `<data_dir>/clipkeep/history.json`.
    pub storage_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_entries: DEFAULT_MAX_ENTRIES,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            storage_path: None,
        }
    }
}

impl Config {
    /// Config with an explicit snapshot path (the test pattern).
    pub fn with_storage_path(path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: Some(path.into()),
            ..Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_behavior() {
        let config = Config::default();
        assert_eq!(config.max_entries, 20);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.max_image_dimension, 512);
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_with_storage_path_overrides_only_path() {
        let config = Config::with_storage_path("/tmp/history.json");
        assert_eq!(
            config.storage_path.as_deref(),
            Some(std::path::Path::new("/tmp/history.json"))
        );
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
    }
}
