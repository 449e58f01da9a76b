//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_cookie_name, default_database_path, default_forbidden_message, default_listen,
    default_true,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Sentinel configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Enforcement toggles.
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Text shown to denied clients.
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:8080".
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or ":memory:".
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Enforcement toggles. A disabled step is skipped, never enforced.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesConfig {
    /// Deny requests from banned IPs (default: true).
    #[serde(default = "default_true")]
    pub ban_check: bool,
    /// Ban clients that request auto-ban paths (default: true).
    #[serde(default = "default_true")]
    pub auto_ban: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            ban_check: true,
            auto_ban: true,
        }
    }
}

/// Pattern cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Seconds between full reloads of every pattern set; 0 disables.
    /// Only needed when another process writes rules to the database.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

impl CacheConfig {
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

/// Session lookup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie carrying the session token (default: "session_token").
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
        }
    }
}

/// Client-facing messages.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    /// Body of every 403 response. Never names the matching rule.
    #[serde(default = "default_forbidden_message")]
    pub forbidden: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            forbidden: default_forbidden_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.database.path, "sentinel.db");
        assert!(config.features.ban_check);
        assert!(config.features.auto_ban);
        assert_eq!(config.cache.refresh_interval(), None);
        assert_eq!(config.session.cookie_name, "session_token");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
listen = "127.0.0.1:9000"

[features]
auto_ban = false

[cache]
refresh_interval_secs = 30

[messages]
forbidden = "Zugriff verweigert."
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert!(config.features.ban_check);
        assert!(!config.features.auto_ban);
        assert_eq!(config.cache.refresh_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.messages.forbidden, "Zugriff verweigert.");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/sentinel.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[features]\nban_check = \"yes\"\n").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
