//! Converts an auto-ban path hit into a persisted ban.
//!
//! The write is insert-or-ignore keyed on the pattern, so a burst of requests
//! from one IP against a forbidden path yields a single row and no caller ever
//! sees a uniqueness error. The ban set is reloaded after every attempt so the
//! next request from that IP is denied at the ban check.

use crate::db::{Database, DbError, NewBan, RuleKind};
use crate::security::pattern_cache::PatternCache;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creator id recorded on bans written by the engine itself.
pub const SYSTEM_USER_ID: i64 = 0;

/// What a ban attempt did to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanOutcome {
    /// A new row was written.
    Created,
    /// The IP was already banned; nothing was written.
    AlreadyBanned,
    /// The client address is not a literal IP; nothing was written.
    Rejected,
}

/// Persists auto-bans and refreshes the ban set.
pub struct AutoBanCoordinator {
    db: Database,
    cache: Arc<PatternCache>,
}

impl AutoBanCoordinator {
    pub fn new(db: Database, cache: Arc<PatternCache>) -> Self {
        Self { db, cache }
    }

    /// Ban `ip` for requesting `triggering_path`, which matched `matched_pattern`.
    ///
    /// Duplicate bans are not errors. A failed reload after a successful
    /// write is logged and the stale ban set stays in use.
    pub async fn create_ban(
        &self,
        ip: &str,
        triggering_path: &str,
        matched_pattern: &str,
    ) -> Result<BanOutcome, DbError> {
        // Forwarding headers are client-controlled. Never persist anything
        // that could act as a wildcard or otherwise fail to be one address.
        if ip.parse::<IpAddr>().is_err() {
            warn!(ip = %ip, path = %triggering_path, "Refusing to auto-ban a non-literal address");
            return Ok(BanOutcome::Rejected);
        }

        let notes = format!("auto-ban: path matched {}", matched_pattern);
        let ban = NewBan {
            pattern: ip,
            notes: &notes,
            triggering_url: triggering_path,
            country_code: None,
            created_by: SYSTEM_USER_ID,
        };

        let inserted = self.db.rules().add_ban_if_absent(&ban).await?;

        self.cache.reload_or_keep(RuleKind::BannedIp, &self.db).await;

        if inserted {
            crate::metrics::record_auto_ban();
            info!(ip = %ip, path = %triggering_path, pattern = %matched_pattern, "Auto-ban stored");
            Ok(BanOutcome::Created)
        } else {
            debug!(ip = %ip, "Auto-ban skipped, IP already banned");
            Ok(BanOutcome::AlreadyBanned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Database, Arc<PatternCache>, AutoBanCoordinator) {
        let db = Database::new(":memory:").await.unwrap();
        let cache = Arc::new(PatternCache::new());
        let coordinator = AutoBanCoordinator::new(db.clone(), Arc::clone(&cache));
        (db, cache, coordinator)
    }

    #[tokio::test]
    async fn test_create_ban_is_visible_immediately() {
        let (db, cache, coordinator) = setup().await;

        let outcome = coordinator
            .create_ban("1.2.3.4", "/wp-admin/login.php", "/wp-admin*")
            .await
            .unwrap();
        assert_eq!(outcome, BanOutcome::Created);
        assert_eq!(cache.banned.find_match("1.2.3.4").as_deref(), Some("1.2.3.4"));

        let stored = db.rules().find_ban("1.2.3.4").await.unwrap().unwrap();
        assert_eq!(stored.triggering_url, "/wp-admin/login.php");
        assert_eq!(stored.created_by, SYSTEM_USER_ID);
        assert!(stored.notes.contains("/wp-admin*"));
    }

    #[tokio::test]
    async fn test_repeat_ban_is_ignored() {
        let (db, _cache, coordinator) = setup().await;

        coordinator.create_ban("1.2.3.4", "/a", "/a").await.unwrap();
        let again = coordinator.create_ban("1.2.3.4", "/b", "/b").await.unwrap();
        assert_eq!(again, BanOutcome::AlreadyBanned);

        // The first triggering URL is kept.
        let stored = db.rules().find_ban("1.2.3.4").await.unwrap().unwrap();
        assert_eq!(stored.triggering_url, "/a");
    }

    #[tokio::test]
    async fn test_non_literal_address_is_not_stored() {
        let (db, cache, coordinator) = setup().await;

        for spoofed in ["1*", "10.0.0.*", "unknown", ""] {
            let outcome = coordinator.create_ban(spoofed, "/.env", "/.env").await.unwrap();
            assert_eq!(outcome, BanOutcome::Rejected);
        }

        assert!(cache.banned.is_empty());
        assert_eq!(db.rules().count_rules(RuleKind::BannedIp).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_bans_store_one_row() {
        let (db, _cache, coordinator) = setup().await;
        let coordinator = Arc::new(coordinator);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    coordinator.create_ban("9.9.9.9", "/.env", "/.env").await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == BanOutcome::Created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(db.rules().count_rules(RuleKind::BannedIp).await.unwrap(), 1);
    }
}
