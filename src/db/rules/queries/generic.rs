//! Generic rule query operations.
//!
//! Whitelist entries and auto-ban path rules share a column layout, so their
//! queries are written once against the [`SimpleRule`] trait. Pattern loading
//! and deletion work on any [`RuleKind`].

use crate::db::rules::models::RuleKind;
use crate::db::{DbError, map_unique_violation};
use sqlx::SqlitePool;

/// Row tuple shared by the simple rule tables: (id, pattern, notes, created_at, created_by).
pub type SimpleRow = (i64, String, String, i64, i64);

/// A rule type stored as (id, pattern, notes, created_at, created_by).
pub trait SimpleRule: Sized {
    /// Which table the rule lives in.
    const KIND: RuleKind;

    /// Construct from a database row.
    fn from_row(row: SimpleRow) -> Self;
}

/// Load every pattern of one category, oldest first.
pub async fn load_patterns(pool: &SqlitePool, kind: RuleKind) -> Result<Vec<String>, DbError> {
    let query = format!("SELECT pattern FROM {} ORDER BY id", kind.table_name());

    let patterns = sqlx::query_scalar::<_, String>(&query)
        .fetch_all(pool)
        .await?;

    Ok(patterns)
}

/// Remove a rule by id.
pub async fn remove_rule(pool: &SqlitePool, kind: RuleKind, id: i64) -> Result<bool, DbError> {
    let query = format!("DELETE FROM {} WHERE id = ?", kind.table_name());

    let result = sqlx::query(&query).bind(id).execute(pool).await?;

    Ok(result.rows_affected() > 0)
}

/// Count the rules in one category.
pub async fn count_rules(pool: &SqlitePool, kind: RuleKind) -> Result<i64, DbError> {
    let query = format!("SELECT COUNT(*) FROM {}", kind.table_name());

    let count = sqlx::query_scalar::<_, i64>(&query).fetch_one(pool).await?;

    Ok(count)
}

/// Insert a simple rule. A pattern that already exists yields [`DbError::Duplicate`].
pub async fn add_rule<T: SimpleRule>(
    pool: &SqlitePool,
    pattern: &str,
    notes: &str,
    created_by: i64,
) -> Result<T, DbError> {
    let now = chrono::Utc::now().timestamp();

    let query = format!(
        r#"
        INSERT INTO {} (pattern, notes, created_at, created_by)
        VALUES (?, ?, ?, ?)
        RETURNING id, pattern, notes, created_at, created_by
        "#,
        T::KIND.table_name()
    );

    let row = sqlx::query_as::<_, SimpleRow>(&query)
        .bind(pattern)
        .bind(notes)
        .bind(now)
        .bind(created_by)
        .fetch_one(pool)
        .await
        .map_err(|e| map_unique_violation(e, pattern))?;

    Ok(T::from_row(row))
}

/// List every rule of a simple category, oldest first.
pub async fn list_rules<T: SimpleRule>(pool: &SqlitePool) -> Result<Vec<T>, DbError> {
    let query = format!(
        "SELECT id, pattern, notes, created_at, created_by FROM {} ORDER BY id",
        T::KIND.table_name()
    );

    let rows = sqlx::query_as::<_, SimpleRow>(&query)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(T::from_row).collect())
}
