//! Configuration, file system paths and logging setup shared by the favorites crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_LOG_LEVEL, DEFAULT_MAX_VISIBLE_ENTRIES, DEFAULT_PAGE_SIZE, DEFAULT_REDIS_URL,
    DEFAULT_SYNC_TTL_HOURS, MAXIMUM_PAGE_SIZE, MAX_SYNC_TTL_HOURS, MIN_SYNC_TTL_HOURS,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
