//! sentinel - IP ban, whitelist and auto-ban path enforcement for HTTP services.
//!
//! Every request passes through an [`security::AccessDecisionPipeline`]
//! before reaching the protected application. Rules live in SQLite and are
//! served from in-memory snapshots that are rebuilt after every change.

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod security;
pub mod state;

pub use state::Sentinel;
