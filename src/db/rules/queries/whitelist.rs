//! Whitelisted IP operations.

use super::super::models::{RuleKind, WhitelistEntry};
use super::generic::{SimpleRow, SimpleRule, add_rule, list_rules};
use crate::db::DbError;
use sqlx::SqlitePool;

impl SimpleRule for WhitelistEntry {
    const KIND: RuleKind = RuleKind::WhitelistIp;

    fn from_row((id, pattern, notes, created_at, created_by): SimpleRow) -> Self {
        Self {
            id,
            pattern,
            notes,
            created_at,
            created_by,
        }
    }
}

/// Add a whitelist entry.
pub async fn add_whitelist(
    pool: &SqlitePool,
    pattern: &str,
    notes: &str,
    created_by: i64,
) -> Result<WhitelistEntry, DbError> {
    add_rule::<WhitelistEntry>(pool, pattern, notes, created_by).await
}

/// List all whitelist entries.
pub async fn list_whitelist(pool: &SqlitePool) -> Result<Vec<WhitelistEntry>, DbError> {
    list_rules::<WhitelistEntry>(pool).await
}
