//! Security module for sentinel.
//!
//! Provides the access-control engine:
//! - **Patterns**: IP and path wildcard matching and validation
//! - **Pattern Cache**: Reloadable in-memory snapshots of the three rule sets
//! - **Auto-ban**: Idempotent ban creation for forbidden-path hits
//! - **Exemption**: Privileged-role lookup, failing closed
//! - **Pipeline**: Priority-ordered per-request decision
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   AccessDecisionPipeline                      │
//! ├──────────────┬──────────────┬─────────────────┬───────────────┤
//! │ PatternCache │   Exemption  │ AutoBanCoord.   │ FeatureToggles│
//! │ wl/ban/paths │ SessionStore │ INSERT OR IGNORE│ ban / autoban │
//! ├──────────────┴──────────────┴─────────────────┴───────────────┤
//! │                  pattern (IpPattern, PathPattern)             │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod auto_ban;
pub mod exemption;
pub mod pattern;
pub mod pattern_cache;
pub mod pipeline;

pub use auto_ban::{AutoBanCoordinator, BanOutcome};
pub use exemption::{ExemptionResolver, Role, SessionRoleResolver, SessionStore, StaticExemption};
pub use pattern::{
    IpPattern, PathPattern, PatternError, is_valid_ip_pattern, is_valid_path_pattern, match_ip,
    match_path,
};
pub use pattern_cache::{PatternCache, PatternSet, PatternSource, spawn_refresh_task};
pub use pipeline::{AccessDecisionPipeline, AllowReason, Decision, FeatureToggles, RequestContext};
