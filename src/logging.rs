//! Structured JSONL logging plus human-readable stderr output.
//!
//! Dual-output logging for embedding applications:
//! - **JSONL to file** (`<data_dir>/clipkeep/logs/clipkeep.jsonl`) - structured, machine-parsable
//! - **Pretty to stderr** - human-readable for developers
//!
//! Call [`init`] once at startup and keep the returned guard alive for the
//! duration of the program; dropping it flushes the file writer.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Guard that must be kept alive for the duration of the program.
/// Dropping this guard will flush and close the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the dual-output logging system.
///
/// Returns a guard that MUST be kept alive for the duration of the
/// program. Safe to call only once per process; embedding applications
/// that install their own subscriber should skip this entirely.
pub fn init() -> LoggingGuard {
    let log_dir = get_log_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("[LOGGING] Failed to create log directory: {}", e);
    }

    let log_path = log_dir.join("clipkeep.jsonl");

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .unwrap_or_else(|e| {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            OpenOptions::new()
                .write(true)
                .open("/dev/null")
                .expect("Failed to open /dev/null")
        });

    // Non-blocking writer so detector ticks never stall on log IO
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file);

    // Default to info, allow override via RUST_LOG
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();

    tracing::info!(
        log_path = %log_path.display(),
        "Content history logging initialized"
    );

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Get the log directory path (`<data_dir>/clipkeep/logs/`)
fn get_log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("clipkeep").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("clipkeep-logs"))
}

/// Get the path to the JSONL log file
pub fn log_path() -> PathBuf {
    get_log_dir().join("clipkeep.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_is_under_log_dir() {
        let path = log_path();
        assert!(path.ends_with("clipkeep.jsonl"));
        assert!(path.parent().is_some());
    }
}
