//! Configuration management for the favorites service.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default refresh interval for cached entry data.
pub const DEFAULT_SYNC_TTL_HOURS: u64 = 24;

/// Lower bound accepted for `SYNC_TTL`.
pub const MIN_SYNC_TTL_HOURS: u64 = 1;

/// Upper bound accepted for `SYNC_TTL` (one week).
pub const MAX_SYNC_TTL_HOURS: u64 = 168;

/// Default cap on entries with `metadata.hidden == false`.
pub const DEFAULT_MAX_VISIBLE_ENTRIES: usize = 35;

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a caller may request.
pub const MAXIMUM_PAGE_SIZE: usize = 100;

/// Main service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log line format ("compact" or "json").
    pub log_format: String,

    /// Redis connection URL for the event feed and audit fan-out.
    pub redis_url: String,
    /// List the lifecycle consumer pops from.
    pub events_list: String,
    /// Hash where consumers register their group names.
    pub subscriptions_hash: String,
    /// Name this service registers under in `subscriptions_hash`.
    pub registration_name: String,
    /// Prefix of per-group audit lists (`<channel>.<group>`).
    pub audit_channel: String,
    /// BLPOP timeout in seconds.
    pub event_block_timeout_secs: u64,

    /// Hours after which a cached entry is refreshed on read.
    pub sync_ttl_hours: u64,
    /// Maximum number of visible entries per document.
    pub max_visible_entries: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,

    /// Base URL paging links are built from.
    pub public_base_url: String,
    /// Base URL of the profiles directory.
    pub profiles_url: String,
    /// Endpoint mapping external people ids to profile keys.
    pub id_mapping_url: String,
    /// Service-to-service token sent to the id mapping endpoint.
    pub s2s_token: Option<String>,
    /// Timeout applied to every directory request.
    pub directory_timeout_secs: u64,

    /// Refresh expired people entries from the profiles directory.
    pub sync_people_changes: bool,
    /// Apply community membership events to entry access flags.
    pub communities_acl_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: "compact".to_string(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            events_list: "events.favorites".to_string(),
            subscriptions_hash: "events.subscriptions".to_string(),
            registration_name: "favorites".to_string(),
            audit_channel: "events".to_string(),
            event_block_timeout_secs: 5,
            sync_ttl_hours: DEFAULT_SYNC_TTL_HOURS,
            max_visible_entries: DEFAULT_MAX_VISIBLE_ENTRIES,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAXIMUM_PAGE_SIZE,
            public_base_url: "http://localhost:3000/favorites/api/entries".to_string(),
            profiles_url: "http://localhost:9080/profiles".to_string(),
            id_mapping_url: "http://localhost:9080/people/api/idmapping".to_string(),
            s2s_token: None,
            directory_timeout_secs: 10,
            sync_people_changes: false,
            communities_acl_sync: true,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from `config.json` under the base directory (if
    /// present), then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.normalize();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable values are ignored. `SYNC_TTL` is only honoured inside
    /// `MIN_SYNC_TTL_HOURS..=MAX_SYNC_TTL_HOURS`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        if let Some(v) = get("FAVORITES_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("FAVORITES_LOG_FORMAT") {
            self.log_format = v;
        }
        if let Some(v) = get("REDIS_URL") {
            self.redis_url = v;
        }
        if let Some(v) = get("FAVORITES_EVENTS_LIST") {
            self.events_list = v;
        }
        if let Some(v) = get("FAVORITES_REGISTRATION_NAME") {
            self.registration_name = v;
        }
        if let Some(hours) = get("SYNC_TTL").and_then(|v| v.parse::<u64>().ok()) {
            if (MIN_SYNC_TTL_HOURS..=MAX_SYNC_TTL_HOURS).contains(&hours) {
                self.sync_ttl_hours = hours;
            }
        }
        if let Some(max) = get("FAVORITES_MAX_VISIBLE_ENTRIES").and_then(|v| v.parse().ok()) {
            self.max_visible_entries = max;
        }
        if let Some(v) = get("FAVORITES_PUBLIC_URL") {
            self.public_base_url = v;
        }
        if let Some(v) = get("FAVORITES_PROFILES_URL") {
            self.profiles_url = v;
        }
        if let Some(v) = get("FAVORITES_ID_MAPPING_URL") {
            self.id_mapping_url = v;
        }
        if let Some(v) = get("FAVORITES_S2S_TOKEN") {
            self.s2s_token = Some(v);
        }
        if let Some(flag) = get("FAVORITES_SYNC_PEOPLE_CHANGES").and_then(parse_flag) {
            self.sync_people_changes = flag;
        }
        if let Some(flag) = get("FAVORITES_COMMUNITIES_ACL_SYNC").and_then(parse_flag) {
            self.communities_acl_sync = flag;
        }
    }

    /// Pull out-of-range values from the config file back to defaults.
    fn normalize(&mut self) {
        if !(MIN_SYNC_TTL_HOURS..=MAX_SYNC_TTL_HOURS).contains(&self.sync_ttl_hours) {
            tracing::warn!(
                sync_ttl_hours = self.sync_ttl_hours,
                "sync ttl out of range, using default"
            );
            self.sync_ttl_hours = DEFAULT_SYNC_TTL_HOURS;
        }
        if self.max_page_size == 0 {
            self.max_page_size = MAXIMUM_PAGE_SIZE;
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            self.default_page_size = DEFAULT_PAGE_SIZE.min(self.max_page_size);
        }
    }

    /// Refresh interval for cached entry data.
    pub fn sync_ttl(&self) -> Duration {
        Duration::from_secs(self.sync_ttl_hours * 3600)
    }

    pub fn event_block_timeout(&self) -> Duration {
        Duration::from_secs(self.event_block_timeout_secs)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    /// Base URL for paging links.
    pub fn public_base_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.public_base_url).map_err(ConfigError::from)
    }

    /// Base URL of the profiles directory, with a trailing slash so that
    /// relative joins stay under it.
    pub fn profiles_url(&self) -> ConfigResult<Url> {
        let mut raw = self.profiles_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(ConfigError::from)
    }

    pub fn id_mapping_url(&self) -> ConfigResult<Url> {
        Url::parse(&self.id_mapping_url).map_err(ConfigError::from)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_flag(raw: String) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.sync_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.max_visible_entries, 35);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 100);
        assert!(!config.sync_people_changes);
        assert!(config.communities_acl_sync);
    }

    #[test]
    fn test_config_load_from_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "max_visible_entries": 5 }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_visible_entries, 5);
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.registration_name = "favorites-test".to_string();
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.registration_name, "favorites-test");
    }

    #[test]
    fn test_sync_ttl_override_bounded() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("SYNC_TTL", "48")]));
        assert_eq!(config.sync_ttl_hours, 48);

        config.apply_overrides(lookup(&[("SYNC_TTL", "0")]));
        assert_eq!(config.sync_ttl_hours, 48);

        config.apply_overrides(lookup(&[("SYNC_TTL", "1000")]));
        assert_eq!(config.sync_ttl_hours, 48);

        config.apply_overrides(lookup(&[("SYNC_TTL", "soon")]));
        assert_eq!(config.sync_ttl_hours, 48);
    }

    #[test]
    fn test_feature_flag_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("FAVORITES_SYNC_PEOPLE_CHANGES", "true"),
            ("FAVORITES_COMMUNITIES_ACL_SYNC", "off"),
            ("FAVORITES_S2S_TOKEN", "  secret  "),
            ("REDIS_URL", ""),
        ]));
        assert!(config.sync_people_changes);
        assert!(!config.communities_acl_sync);
        assert_eq!(config.s2s_token.as_deref(), Some("secret"));
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
    }

    #[test]
    fn test_normalize_resets_out_of_range_values() {
        let mut config = Config {
            sync_ttl_hours: 0,
            max_page_size: 0,
            default_page_size: 500,
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.sync_ttl_hours, DEFAULT_SYNC_TTL_HOURS);
        assert_eq!(config.max_page_size, MAXIMUM_PAGE_SIZE);
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_profiles_url_gets_trailing_slash() {
        let config = Config {
            profiles_url: "https://directory.example.com/profiles".to_string(),
            ..Config::default()
        };
        let url = config.profiles_url().unwrap();
        assert_eq!(
            url.join("json/profile.do").unwrap().as_str(),
            "https://directory.example.com/profiles/json/profile.do"
        );
    }

    #[test]
    fn test_invalid_public_url() {
        let config = Config {
            public_base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.public_base_url().is_err());
    }
}
