//! Session role lookup.
//!
//! Sessions are created and expired by the authentication layer; sentinel
//! only reads the role bound to a token.

use super::DbError;
use sqlx::SqlitePool;

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Role name bound to an unexpired session token, if any.
    pub async fn role_for_token(&self, token: &str) -> Result<Option<String>, DbError> {
        let now = chrono::Utc::now().timestamp();

        let role = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role FROM sessions
            WHERE token = ? AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    /// Store a session. Used by the authentication layer and by tests.
    pub async fn upsert_session(
        &self,
        token: &str,
        user_id: i64,
        role: &str,
        ttl_secs: Option<i64>,
    ) -> Result<(), DbError> {
        let expires_at = ttl_secs.map(|ttl| chrono::Utc::now().timestamp() + ttl);

        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, role, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                user_id = excluded.user_id,
                role = excluded.role,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(role)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
