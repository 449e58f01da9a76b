//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

pub fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn default_database_path() -> String {
    "sentinel.db".to_string()
}

pub fn default_cookie_name() -> String {
    "session_token".to_string()
}

pub fn default_forbidden_message() -> String {
    "Access denied.".to_string()
}
