//! Error types for the rule administration boundary.
//!
//! Storage and pattern errors live beside their modules ([`DbError`],
//! [`PatternError`]); this module maps them to what an admin caller sees.

use crate::db::DbError;
use crate::security::PatternError;
use thiserror::Error;

/// Errors returned by [`crate::admin::RuleAdmin`].
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("pattern already exists: {0}")]
    AlreadyExists(String),

    /// The ban pattern matches the acting admin's own address.
    #[error("refusing to ban {0}: it matches your own IP")]
    SelfBan(String),

    #[error("no rule with id {0}")]
    NotFound(i64),

    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for AdminError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(pattern) => AdminError::AlreadyExists(pattern),
            other => AdminError::Db(other),
        }
    }
}

impl AdminError {
    /// Get a static error code string for logging and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPattern(_) => "invalid_pattern",
            Self::AlreadyExists(_) => "already_exists",
            Self::SelfBan(_) => "self_ban",
            Self::NotFound(_) => "not_found",
            Self::Db(_) => "database_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_already_exists() {
        let err: AdminError = DbError::Duplicate("10.0.0.*".into()).into();
        assert!(matches!(err, AdminError::AlreadyExists(ref p) if p == "10.0.0.*"));
        assert_eq!(err.error_code(), "already_exists");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AdminError::from(PatternError::Empty).error_code(), "invalid_pattern");
        assert_eq!(AdminError::SelfBan("1.2.3.*".into()).error_code(), "self_ban");
        assert_eq!(AdminError::NotFound(4).error_code(), "not_found");
    }
}
