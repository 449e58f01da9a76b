//! Database query methods for access rules.

pub mod autoban_path;
pub mod banned;
pub mod generic;
pub mod whitelist;

use super::models::{AutoBanPathRule, BanRecord, NewBan, RuleKind, WhitelistEntry};
use crate::db::DbError;
use sqlx::SqlitePool;

/// Generates repository wrapper methods that forward to module-level query functions.
macro_rules! rule_repository_methods {
    (
        $(
            $(#[$meta:meta])*
            fn $method_name:ident($($arg:ident: $arg_ty:ty),*) -> $ret_ty:ty
                => $module:ident::$fn_name:ident;
        )*
    ) => {
        $(
            $(#[$meta])*
            pub async fn $method_name(&self, $($arg: $arg_ty),*) -> $ret_ty {
                $module::$fn_name(self.pool, $($arg),*).await
            }
        )*
    };
}

/// Repository for access rule operations.
pub struct RuleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RuleRepository<'a> {
    /// Create a new rule repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    rule_repository_methods! {
        // ========== Shared operations ==========

        /// Load every pattern of one category, oldest first.
        fn load_patterns(kind: RuleKind) -> Result<Vec<String>, DbError>
            => generic::load_patterns;

        /// Remove a rule by id.
        fn remove_rule(kind: RuleKind, id: i64) -> Result<bool, DbError>
            => generic::remove_rule;

        /// Count the rules in one category.
        fn count_rules(kind: RuleKind) -> Result<i64, DbError>
            => generic::count_rules;

        // ========== Ban operations ==========

        /// Insert a ban, failing with `Duplicate` if the pattern exists.
        fn add_ban(ban: &NewBan<'_>) -> Result<BanRecord, DbError>
            => banned::add_ban;

        /// Insert a ban unless the pattern already exists.
        fn add_ban_if_absent(ban: &NewBan<'_>) -> Result<bool, DbError>
            => banned::add_ban_if_absent;

        /// List all bans.
        fn list_bans() -> Result<Vec<BanRecord>, DbError>
            => banned::list_bans;

        /// Look up a ban by exact pattern.
        fn find_ban(pattern: &str) -> Result<Option<BanRecord>, DbError>
            => banned::find_ban;

        // ========== Whitelist operations ==========

        /// Add a whitelist entry.
        fn add_whitelist(pattern: &str, notes: &str, created_by: i64) -> Result<WhitelistEntry, DbError>
            => whitelist::add_whitelist;

        /// List all whitelist entries.
        fn list_whitelist() -> Result<Vec<WhitelistEntry>, DbError>
            => whitelist::list_whitelist;

        // ========== Auto-ban path operations ==========

        /// Add an auto-ban path rule.
        fn add_autoban_path(pattern: &str, notes: &str, created_by: i64) -> Result<AutoBanPathRule, DbError>
            => autoban_path::add_autoban_path;

        /// List all auto-ban path rules.
        fn list_autoban_paths() -> Result<Vec<AutoBanPathRule>, DbError>
            => autoban_path::list_autoban_paths;
    }
}
