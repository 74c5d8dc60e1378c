//! Logging initialization.
//!
//! Thin wrapper over the `observability` package so binaries only need a
//! level and a format string.

use observability::{LogConfig, LogFormat};
use std::path::PathBuf;

/// Initialize logging for the favorites daemon.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```ignore
/// init_logging("info", "compact", None);
/// tracing::info!("favorites daemon started");
/// ```
pub fn init_logging(level: &str, format: &str, log_file: Option<PathBuf>) {
    init_logging_for_service("favorites-daemon", level, format, log_file);
}

/// Initialize logging under a custom service name.
pub fn init_logging_for_service(
    service_name: &str,
    level: &str,
    format: &str,
    log_file: Option<PathBuf>,
) {
    let also_stderr = log_file.is_some();
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        format: LogFormat::parse(format),
        log_path: log_file,
        also_stderr,
    });
}
