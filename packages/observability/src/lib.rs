//! # Observability
//!
//! Shared logging setup for the favorites services.
//!
//! Services call [`init_with_config`] once at startup and then use the
//! standard `tracing` macros. Where the lines end up is decided here:
//!
//! - [`LogFormat::Compact`] writes human-readable lines to stderr.
//! - [`LogFormat::Json`] writes one JSON object per line, either to stderr or
//!   to an append-only file when `log_path` is set.
//!
//! `RUST_LOG` always wins over the configured default level.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "favorites-daemon".into(),
//!     default_level: "debug".into(),
//!     format: observability::LogFormat::Json,
//!     ..Default::default()
//! });
//! ```

mod file_writer;
mod json_layer;

use std::path::PathBuf;

pub use file_writer::AppendFileWriter;
pub use json_layer::{JsonLayer, LogLine};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parse a format name, falling back to compact output for unknown values.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSON line.
    pub service_name: String,

    /// Default filter directive (e.g. "info", "favorites_daemon=debug").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    /// Line format.
    pub format: LogFormat,

    /// Append JSON lines to this file instead of stderr.
    pub log_path: Option<PathBuf>,

    /// When writing to a file, also mirror compact lines to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging from a full [`LogConfig`].
///
/// Calling this more than once is harmless: later calls leave the already
/// installed subscriber in place.
pub fn init_with_config(config: LogConfig) {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let file_writer = match &config.log_path {
        Some(path) => match AppendFileWriter::open(path) {
            Ok(writer) => Some(writer),
            Err(err) => {
                eprintln!("failed to open log file {}: {}", path.display(), err);
                None
            }
        },
        None => None,
    };

    let result = match (config.format, file_writer) {
        (_, Some(writer)) => {
            let json = JsonLayer::new(config.service_name.clone(), writer).with_filter(filter());
            let stderr = config.also_stderr.then(|| {
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_filter(filter())
            });
            tracing_subscriber::registry()
                .with(json)
                .with(stderr)
                .try_init()
        }
        (LogFormat::Json, None) => tracing_subscriber::registry()
            .with(JsonLayer::new(config.service_name.clone(), std::io::stderr).with_filter(filter()))
            .try_init(),
        (LogFormat::Compact, None) => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_filter(filter()),
            )
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(service = %config.service_name, "logging initialized");
    }
}

pub use tracing::{debug, error, info, instrument, trace, warn};
pub use tracing::Level;
