//! Repository for access rules: banned IPs, whitelisted IPs, auto-ban paths.

mod models;
mod queries;

pub use models::{AutoBanPathRule, BanRecord, NewBan, RuleKind, WhitelistEntry};
pub use queries::RuleRepository;
