//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::db::MEMORY_PATH;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.listen is not a socket address: {0}")]
    InvalidListenAddress(String),
    #[error("database.path is required")]
    MissingDatabasePath,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("session.cookie_name is required")]
    MissingCookieName,
    #[error("messages.forbidden is required")]
    MissingForbiddenMessage,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.listen.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidListenAddress(config.server.listen.clone()));
    }

    let db_path = &config.database.path;
    if db_path.is_empty() {
        errors.push(ValidationError::MissingDatabasePath);
    } else if db_path != MEMORY_PATH
        && let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::DatabasePathInvalid(db_path.clone()));
    }

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::MissingCookieName);
    }

    if config.messages.forbidden.trim().is_empty() {
        errors.push(ValidationError::MissingForbiddenMessage);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_all_errors_reported() {
        let toml = r#"
[server]
listen = "not-an-address"

[database]
path = "/nonexistent/dir/sentinel.db"

[session]
cookie_name = " "

[messages]
forbidden = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();

        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidListenAddress(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DatabasePathInvalid(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingCookieName)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingForbiddenMessage)));
    }

    #[test]
    fn test_memory_database_is_valid() {
        let config: Config = toml::from_str("[database]\npath = \":memory:\"\n").unwrap();
        assert!(validate(&config).is_ok());
    }
}
