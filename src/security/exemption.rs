//! Privileged-role exemption from auto-ban.
//!
//! The decision pipeline asks an [`ExemptionResolver`] whether the caller is
//! privileged before turning an auto-ban path hit into a ban. The resolver is
//! injected, so the pipeline never touches session storage directly.
//!
//! Exemption fails closed: a missing token, an unknown or expired session,
//! an unrecognized role, or a store error all mean "not exempt".

use crate::db::{Database, DbError};
use crate::security::pipeline::RequestContext;
use async_trait::async_trait;
use std::str::FromStr;
use tracing::warn;

/// Role attached to an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Editor,
    User,
}

impl Role {
    /// Privileged roles may touch auto-ban paths without being banned.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "user" => Ok(Role::User),
            _ => Err(()),
        }
    }
}

/// Decides whether the caller of a request is exempt from auto-ban.
#[async_trait]
pub trait ExemptionResolver: Send + Sync {
    async fn is_exempt(&self, ctx: &RequestContext) -> bool;
}

/// Looks up the role bound to a session token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Raw role name for an active session, `None` if there is none.
    async fn role_for_token(&self, token: &str) -> Result<Option<String>, DbError>;
}

#[async_trait]
impl SessionStore for Database {
    async fn role_for_token(&self, token: &str) -> Result<Option<String>, DbError> {
        self.sessions().role_for_token(token).await
    }
}

/// Resolves exemption from the request's session token via a [`SessionStore`].
pub struct SessionRoleResolver<S> {
    store: S,
}

impl<S: SessionStore> SessionRoleResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The privileged role of `token`'s session, if resolvable.
    async fn resolve(&self, token: &str) -> Option<Role> {
        match self.store.role_for_token(token).await {
            Ok(Some(name)) => match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(()) => {
                    warn!(role = %name, "Session carries an unknown role, treating as not exempt");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Session lookup failed, treating caller as not exempt");
                None
            }
        }
    }
}

#[async_trait]
impl<S: SessionStore> ExemptionResolver for SessionRoleResolver<S> {
    async fn is_exempt(&self, ctx: &RequestContext) -> bool {
        let Some(token) = ctx.session_token.as_deref() else {
            return false;
        };
        self.resolve(token)
            .await
            .is_some_and(|role| role.is_privileged())
    }
}

/// Gives the same answer for every request.
#[derive(Debug, Clone, Copy)]
pub struct StaticExemption(pub bool);

#[async_trait]
impl ExemptionResolver for StaticExemption {
    async fn is_exempt(&self, _ctx: &RequestContext) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn role_for_token(&self, _token: &str) -> Result<Option<String>, DbError> {
            Err(DbError::Sqlx(sqlx::Error::PoolClosed))
        }
    }

    fn ctx(token: Option<&str>) -> RequestContext {
        RequestContext {
            ip: Some("1.2.3.4".to_string()),
            path: "/wp-admin".to_string(),
            session_token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" editor ".parse::<Role>(), Ok(Role::Editor));
        assert!("root".parse::<Role>().is_err());
        assert!(Role::Admin.is_privileged());
        assert!(Role::Editor.is_privileged());
        assert!(!Role::User.is_privileged());
    }

    #[tokio::test]
    async fn test_privileged_sessions_are_exempt() {
        let db = Database::new(":memory:").await.unwrap();
        db.sessions().upsert_session("adm", 1, "admin", None).await.unwrap();
        db.sessions().upsert_session("ed", 2, "editor", None).await.unwrap();
        db.sessions().upsert_session("usr", 3, "user", None).await.unwrap();
        db.sessions().upsert_session("odd", 4, "superuser", None).await.unwrap();

        let resolver = SessionRoleResolver::new(db);
        assert!(resolver.is_exempt(&ctx(Some("adm"))).await);
        assert!(resolver.is_exempt(&ctx(Some("ed"))).await);
        assert!(!resolver.is_exempt(&ctx(Some("usr"))).await);
        assert!(!resolver.is_exempt(&ctx(Some("odd"))).await);
        assert!(!resolver.is_exempt(&ctx(Some("nope"))).await);
        assert!(!resolver.is_exempt(&ctx(None)).await);
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let resolver = SessionRoleResolver::new(FailingStore);
        assert!(!resolver.is_exempt(&ctx(Some("adm"))).await);
    }
}
