//! Configuration loading and management.
//!
//! - [`types`]: Config struct definitions and loading
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
pub mod validation;

pub use types::{
    CacheConfig, Config, ConfigError, DatabaseConfig, FeaturesConfig, MessagesConfig,
    ServerConfig, SessionConfig,
};
pub use validation::{ValidationError, validate};
