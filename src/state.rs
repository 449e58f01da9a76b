//! Central shared state for sentinel.
//!
//! [`Sentinel`] owns the database handle, the pattern cache and the
//! components built on top of them. It is constructed once at startup and
//! shared behind an `Arc` by the HTTP layer and any admin surface.

use crate::admin::RuleAdmin;
use crate::config::Config;
use crate::db::{Database, DbError};
use crate::security::{
    AccessDecisionPipeline, AutoBanCoordinator, ExemptionResolver, FeatureToggles, PatternCache,
    PatternSource, SessionRoleResolver, spawn_refresh_task,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Everything the engine needs at runtime.
pub struct Sentinel {
    pub db: Database,
    pub cache: Arc<PatternCache>,
    pub toggles: Arc<FeatureToggles>,
    pub pipeline: Arc<AccessDecisionPipeline>,
    pub admin: RuleAdmin,
}

impl Sentinel {
    /// Wire the engine with session-based exemption and load every pattern set.
    ///
    /// A failed initial load is an error: serving without rules in memory
    /// would silently disable enforcement.
    pub async fn start(db: Database, config: &Config) -> Result<Self, DbError> {
        let exemption: Arc<dyn ExemptionResolver> = Arc::new(SessionRoleResolver::new(db.clone()));
        Self::start_with_exemption(db, config, exemption).await
    }

    /// As [`Sentinel::start`] with a caller-supplied exemption resolver.
    pub async fn start_with_exemption(
        db: Database,
        config: &Config,
        exemption: Arc<dyn ExemptionResolver>,
    ) -> Result<Self, DbError> {
        let cache = Arc::new(PatternCache::new());
        cache.reload_all(&db).await?;

        info!(
            whitelist = cache.whitelist.len(),
            banned = cache.banned.len(),
            autoban_paths = cache.autoban_paths.len(),
            "Loaded access rules into cache"
        );

        let toggles = Arc::new(FeatureToggles::new(
            config.features.ban_check,
            config.features.auto_ban,
        ));
        let auto_ban = Arc::new(AutoBanCoordinator::new(db.clone(), Arc::clone(&cache)));
        let pipeline = Arc::new(AccessDecisionPipeline::new(
            Arc::clone(&cache),
            auto_ban,
            exemption,
            Arc::clone(&toggles),
        ));
        let admin = RuleAdmin::new(db.clone(), Arc::clone(&cache));

        Ok(Self {
            db,
            cache,
            toggles,
            pipeline,
            admin,
        })
    }

    /// Start the periodic full reload, if an interval is given.
    pub fn spawn_refresh(&self, period: Option<Duration>) -> Option<JoinHandle<()>> {
        let period = period?;
        info!(secs = period.as_secs(), "Pattern cache refresh enabled");
        let source: Arc<dyn PatternSource> = Arc::new(self.db.clone());
        Some(spawn_refresh_task(Arc::clone(&self.cache), source, period))
    }
}
