//! Auto-ban path operations.

use super::super::models::{AutoBanPathRule, RuleKind};
use super::generic::{SimpleRow, SimpleRule, add_rule, list_rules};
use crate::db::DbError;
use sqlx::SqlitePool;

impl SimpleRule for AutoBanPathRule {
    const KIND: RuleKind = RuleKind::AutoBanPath;

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

/// Add an auto-ban path rule.
pub async fn add_autoban_path(
    pool: &SqlitePool,
    pattern: &str,
    notes: &str,
    created_by: i64,
) -> Result<AutoBanPathRule, DbError> {
    add_rule::<AutoBanPathRule>(pool, pattern, notes, created_by).await
}

/// List all auto-ban path rules.
pub async fn list_autoban_paths(pool: &SqlitePool) -> Result<Vec<AutoBanPathRule>, DbError> {
    list_rules::<AutoBanPathRule>(pool).await
}
