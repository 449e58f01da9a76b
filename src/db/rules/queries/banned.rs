//! Banned IP operations.

use super::super::models::{BanRecord, NewBan};
use crate::db::{DbError, map_unique_violation};
use sqlx::SqlitePool;

type BanRow = (i64, String, String, String, Option<String>, i64, i64);

fn from_row(
    (id, pattern, notes, triggering_url, country_code, created_at, created_by): BanRow,
) -> BanRecord {
    BanRecord {
        id,
        pattern,
        notes,
        triggering_url,
        country_code,
        created_at,
        created_by,
    }
}

/// Insert a ban. A pattern that is already banned yields [`DbError::Duplicate`].
pub async fn add_ban(pool: &SqlitePool, ban: &NewBan<'_>) -> Result<BanRecord, DbError> {
    let now = chrono::Utc::now().timestamp();

    let row = sqlx::query_as::<_, BanRow>(
        r#"
        INSERT INTO banned_ips (pattern, notes, triggering_url, country_code, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, pattern, notes, triggering_url, country_code, created_at, created_by
        "#,
    )
    .bind(ban.pattern)
    .bind(ban.notes)
    .bind(ban.triggering_url)
    .bind(ban.country_code)
    .bind(now)
    .bind(ban.created_by)
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique_violation(e, ban.pattern))?;

    Ok(from_row(row))
}

/// Insert a ban unless the pattern is already banned.
///
/// Returns `true` when a row was written. Concurrent callers racing on the
/// same pattern get exactly one `true`.
pub async fn add_ban_if_absent(pool: &SqlitePool, ban: &NewBan<'_>) -> Result<bool, DbError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO banned_ips (pattern, notes, triggering_url, country_code, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(ban.pattern)
    .bind(ban.notes)
    .bind(ban.triggering_url)
    .bind(ban.country_code)
    .bind(now)
    .bind(ban.created_by)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List all bans, oldest first.
pub async fn list_bans(pool: &SqlitePool) -> Result<Vec<BanRecord>, DbError> {
    let rows = sqlx::query_as::<_, BanRow>(
        r#"
        SELECT id, pattern, notes, triggering_url, country_code, created_at, created_by
        FROM banned_ips
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(from_row).collect())
}

/// Look up a ban by its exact pattern.
pub async fn find_ban(pool: &SqlitePool, pattern: &str) -> Result<Option<BanRecord>, DbError> {
    let row = sqlx::query_as::<_, BanRow>(
        r#"
        SELECT id, pattern, notes, triggering_url, country_code, created_at, created_by
        FROM banned_ips
        WHERE pattern = ?
        "#,
    )
    .bind(pattern)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(from_row))
}
