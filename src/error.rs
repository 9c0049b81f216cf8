use thiserror::Error;
use tracing::{error, warn};

/// Domain-specific errors for the content history engine.
///
/// Nothing here is fatal: every failure is either dropped at the detector
/// loop, swallowed at the store boundary, or reported as a no-op. These
/// variants exist so internal seams (clipboard, persistence, image codec)
/// can say *why* something failed before the caller decides to move on.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("clipboard access failed: {0}")]
    Clipboard(String),

    #[error("captured content could not be processed: {0}")]
    Capture(String),

    #[error("snapshot io failed for '{path}': {source}")]
    SnapshotIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot serialization failed: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Extension trait for silent error logging.
/// Use when the operation is recoverable and the caller doesn't need to know.
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?e,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?e,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation warning"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_err_passes_through_ok() {
        let result: std::result::Result<u32, &str> = Ok(42);
        assert_eq!(result.log_err(), Some(42));
    }

    #[test]
    fn test_log_err_swallows_err() {
        let result: std::result::Result<u32, &str> = Err("boom");
        assert_eq!(result.log_err(), None);
    }

    #[test]
    fn test_error_display_includes_context() {
        let err = HistoryError::Clipboard("no backend".into());
        assert!(err.to_string().contains("no backend"));
    }
}
