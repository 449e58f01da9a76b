//! Rule administration.
//!
//! [`RuleAdmin`] is the create/list/delete boundary for bans, whitelist
//! entries and auto-ban paths. Patterns are validated before storage and are
//! never normalized. Every successful mutation reloads the affected set, so
//! the change is in force for requests that start after the call returns.

use crate::db::{AutoBanPathRule, BanRecord, Database, NewBan, RuleKind, WhitelistEntry};
use crate::error::AdminError;
use crate::security::pattern::{match_ip, validate_ip_pattern, validate_path_pattern};
use crate::security::pattern_cache::PatternCache;
use std::sync::Arc;
use tracing::info;

/// Input for an admin-created ban.
#[derive(Debug, Clone, Copy, Default)]
pub struct BanRequest<'a> {
    pub pattern: &'a str,
    pub notes: &'a str,
    /// Advisory, supplied by the caller.
    pub country_code: Option<&'a str>,
}

/// Service layer over the rule tables and the pattern cache.
pub struct RuleAdmin {
    db: Database,
    cache: Arc<PatternCache>,
}

impl RuleAdmin {
    pub fn new(db: Database, cache: Arc<PatternCache>) -> Self {
        Self { db, cache }
    }

    // ========== Bans ==========

    /// Create a ban on behalf of admin `created_by` connecting from `actor_ip`.
    ///
    /// A pattern that would cover `actor_ip` is rejected with
    /// [`AdminError::SelfBan`] and nothing is written.
    pub async fn create_ban(
        &self,
        actor_ip: &str,
        created_by: i64,
        request: BanRequest<'_>,
    ) -> Result<BanRecord, AdminError> {
        validate_ip_pattern(request.pattern)?;

        if match_ip(request.pattern, actor_ip) {
            return Err(AdminError::SelfBan(request.pattern.to_string()));
        }

        let record = self
            .db
            .rules()
            .add_ban(&NewBan {
                pattern: request.pattern,
                notes: request.notes,
                triggering_url: "",
                country_code: request.country_code,
                created_by,
            })
            .await?;

        info!(pattern = %record.pattern, created_by, "Ban created");
        self.refresh(RuleKind::BannedIp).await;
        Ok(record)
    }

    pub async fn list_bans(&self) -> Result<Vec<BanRecord>, AdminError> {
        Ok(self.db.rules().list_bans().await?)
    }

    pub async fn delete_ban(&self, id: i64) -> Result<(), AdminError> {
        self.delete(RuleKind::BannedIp, id).await
    }

    // ========== Whitelist ==========

    pub async fn create_whitelist(
        &self,
        pattern: &str,
        notes: &str,
        created_by: i64,
    ) -> Result<WhitelistEntry, AdminError> {
        validate_ip_pattern(pattern)?;

        let entry = self
            .db
            .rules()
            .add_whitelist(pattern, notes, created_by)
            .await?;

        info!(pattern = %entry.pattern, created_by, "Whitelist entry created");
        self.refresh(RuleKind::WhitelistIp).await;
        Ok(entry)
    }

    pub async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, AdminError> {
        Ok(self.db.rules().list_whitelist().await?)
    }

    pub async fn delete_whitelist(&self, id: i64) -> Result<(), AdminError> {
        self.delete(RuleKind::WhitelistIp, id).await
    }

    // ========== Auto-ban paths ==========

    pub async fn create_autoban_path(
        &self,
        pattern: &str,
        notes: &str,
        created_by: i64,
    ) -> Result<AutoBanPathRule, AdminError> {
        validate_path_pattern(pattern)?;

        let rule = self
            .db
            .rules()
            .add_autoban_path(pattern, notes, created_by)
            .await?;

        info!(pattern = %rule.pattern, created_by, "Auto-ban path created");
        self.refresh(RuleKind::AutoBanPath).await;
        Ok(rule)
    }

    pub async fn list_autoban_paths(&self) -> Result<Vec<AutoBanPathRule>, AdminError> {
        Ok(self.db.rules().list_autoban_paths().await?)
    }

    pub async fn delete_autoban_path(&self, id: i64) -> Result<(), AdminError> {
        self.delete(RuleKind::AutoBanPath, id).await
    }

    async fn delete(&self, kind: RuleKind, id: i64) -> Result<(), AdminError> {
        if !self.db.rules().remove_rule(kind, id).await? {
            return Err(AdminError::NotFound(id));
        }

        info!(kind = %kind, id, "Rule deleted");
        self.refresh(kind).await;
        Ok(())
    }

    /// The row is already committed, so a failed reload keeps the old
    /// snapshot rather than failing the call.
    async fn refresh(&self, kind: RuleKind) {
        self.cache.reload_or_keep(kind, &self.db).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::PatternError;

    async fn setup() -> (Database, Arc<PatternCache>, RuleAdmin) {
        let db = Database::new(":memory:").await.unwrap();
        let cache = Arc::new(PatternCache::new());
        let admin = RuleAdmin::new(db.clone(), Arc::clone(&cache));
        (db, cache, admin)
    }

    fn ban(pattern: &str) -> BanRequest<'_> {
        BanRequest {
            pattern,
            notes: "test",
            country_code: None,
        }
    }

    #[tokio::test]
    async fn test_create_ban_reloads_cache() {
        let (_db, cache, admin) = setup().await;

        let record = admin
            .create_ban(
                "192.168.1.10",
                1,
                BanRequest {
                    pattern: "10.0.0.*",
                    notes: "scanner range",
                    country_code: Some("NL"),
                },
            )
            .await
            .unwrap();

        assert_eq!(record.created_by, 1);
        assert_eq!(record.country_code.as_deref(), Some("NL"));
        assert_eq!(cache.banned.find_match("10.0.0.5").as_deref(), Some("10.0.0.*"));
    }

    #[tokio::test]
    async fn test_self_ban_is_rejected() {
        let (db, cache, admin) = setup().await;

        let err = admin
            .create_ban("192.168.1.10", 1, ban("192.168.1.*"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::SelfBan(ref p) if p == "192.168.1.*"));

        let err = admin
            .create_ban("192.168.1.10", 1, ban("192.168.1.10"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::SelfBan(_)));

        assert_eq!(db.rules().count_rules(RuleKind::BannedIp).await.unwrap(), 0);
        assert!(cache.banned.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_patterns_are_rejected() {
        let (db, _cache, admin) = setup().await;

        let err = admin.create_ban("1.1.1.1", 1, ban("*")).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidPattern(PatternError::Global(_))));

        let err = admin.create_ban("1.1.1.1", 1, ban("10.0.0.1 ")).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidPattern(PatternError::InvalidCharacter(' '))));

        let err = admin.create_autoban_path("wp-admin", "", 1).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidPattern(PatternError::MissingLeadingSlash)));

        let err = admin.create_whitelist("", "", 1).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidPattern(PatternError::Empty)));

        assert_eq!(db.rules().count_rules(RuleKind::BannedIp).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_is_already_exists() {
        let (_db, _cache, admin) = setup().await;

        admin.create_autoban_path("/.env", "", 1).await.unwrap();
        let err = admin.create_autoban_path("/.env", "", 1).await.unwrap_err();
        assert!(matches!(err, AdminError::AlreadyExists(ref p) if p == "/.env"));

        admin.create_ban("1.1.1.1", 1, ban("5.5.5.5")).await.unwrap();
        let err = admin.create_ban("1.1.1.1", 1, ban("5.5.5.5")).await.unwrap_err();
        assert!(matches!(err, AdminError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_delete_reloads_cache() {
        let (_db, cache, admin) = setup().await;

        let entry = admin.create_whitelist("10.1.*", "office", 1).await.unwrap();
        assert!(cache.whitelist.find_match("10.1.2.3").is_some());

        admin.delete_whitelist(entry.id).await.unwrap();
        assert!(cache.whitelist.find_match("10.1.2.3").is_none());
        assert!(admin.list_whitelist().await.unwrap().is_empty());

        let err = admin.delete_whitelist(entry.id).await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(id) if id == entry.id));
    }

    #[tokio::test]
    async fn test_list_and_delete_each_kind() {
        let (_db, cache, admin) = setup().await;

        let b = admin.create_ban("1.1.1.1", 1, ban("6.6.6.6")).await.unwrap();
        let p = admin.create_autoban_path("/wp-admin*", "", 1).await.unwrap();

        assert_eq!(admin.list_bans().await.unwrap().len(), 1);
        assert_eq!(admin.list_autoban_paths().await.unwrap()[0].pattern, "/wp-admin*");
        assert!(cache.autoban_paths.find_match("/wp-admin/setup.php").is_some());

        admin.delete_ban(b.id).await.unwrap();
        admin.delete_autoban_path(p.id).await.unwrap();

        assert!(cache.banned.is_empty());
        assert!(cache.autoban_paths.is_empty());
    }
}
