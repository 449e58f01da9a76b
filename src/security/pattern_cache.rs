//! In-memory pattern snapshots for request-time checks.
//!
//! Holds three independent sets (whitelist IPs, banned IPs, auto-ban paths),
//! each loaded wholesale from the database.
//!
//! # Architecture
//!
//! - A set's contents are an immutable `Arc<[CachedPattern<P>]>`.
//! - Readers take the read lock only long enough to clone the `Arc`, then
//!   iterate without any lock held.
//! - `reload` fetches the full category, compiles it, and swaps the `Arc`
//!   under a brief write lock. Concurrent readers see either the old or the
//!   new snapshot, never a mix.
//! - Reloads of one set are serialized by an async guard held across the
//!   fetch, so a slow older fetch can never overwrite a newer one. The
//!   read/write lock is never held across I/O.
//! - The sets share no lock and never reload each other.
//!
//! A request that is in flight while a reload runs may still evaluate against
//! the previous snapshot. A new ban is guaranteed visible only to requests that
//! start after the reload returns.

use crate::db::{Database, DbError, RuleKind};
use crate::security::pattern::{
    IpPattern, PathPattern, PatternError, validate_ip_pattern, validate_path_pattern,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Where a set's patterns are loaded from.
#[async_trait]
pub trait PatternSource: Send + Sync {
    /// Fetch every stored pattern of one category.
    async fn fetch_patterns(&self, kind: RuleKind) -> Result<Vec<String>, DbError>;
}

#[async_trait]
impl PatternSource for Database {
    async fn fetch_patterns(&self, kind: RuleKind) -> Result<Vec<String>, DbError> {
        self.rules().load_patterns(kind).await
    }
}

/// A pattern form that can be compiled from its stored text and matched.
pub trait Matcher: Sized + Send + Sync + 'static {
    /// Validate and compile a stored pattern.
    fn from_stored(raw: &str) -> Result<Self, PatternError>;

    /// Check a candidate value (IP or path) against the compiled pattern.
    fn is_match(&self, value: &str) -> bool;
}

impl Matcher for IpPattern {
    fn from_stored(raw: &str) -> Result<Self, PatternError> {
        validate_ip_pattern(raw)?;
        Ok(IpPattern::compile(raw))
    }

    #[inline]
    fn is_match(&self, value: &str) -> bool {
        self.matches(value)
    }
}

impl Matcher for PathPattern {
    fn from_stored(raw: &str) -> Result<Self, PatternError> {
        validate_path_pattern(raw)?;
        Ok(PathPattern::compile(raw))
    }

    #[inline]
    fn is_match(&self, value: &str) -> bool {
        self.matches(value)
    }
}

/// A compiled pattern along with the text it was stored as.
#[derive(Debug, Clone)]
pub struct CachedPattern<P> {
    pub raw: String,
    pub compiled: P,
}

/// One independently reloadable pattern set.
pub struct PatternSet<P> {
    kind: RuleKind,
    snapshot: RwLock<Arc<[CachedPattern<P>]>>,
    reload_guard: tokio::sync::Mutex<()>,
}

impl<P: Matcher> PatternSet<P> {
    /// Create an empty set.
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            snapshot: RwLock::new(Arc::from(Vec::new())),
            reload_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// The current snapshot. Holds no lock once returned.
    pub fn snapshot(&self) -> Arc<[CachedPattern<P>]> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored text of the first pattern matching `value`.
    pub fn find_match(&self, value: &str) -> Option<String> {
        let snapshot = self.snapshot();
        snapshot
            .iter()
            .find(|p| p.compiled.is_match(value))
            .map(|p| p.raw.clone())
    }

    /// Compile `patterns` and publish them as the new snapshot.
    ///
    /// Rows that fail validation are skipped. Returns the number published.
    pub fn replace(&self, patterns: Vec<String>) -> usize {
        let compiled: Vec<CachedPattern<P>> = patterns
            .into_iter()
            .filter_map(|raw| match P::from_stored(&raw) {
                Ok(compiled) => Some(CachedPattern { raw, compiled }),
                Err(e) => {
                    warn!(set = %self.kind, pattern = %raw, error = %e, "Skipping invalid stored pattern");
                    None
                }
            })
            .collect();

        let count = compiled.len();
        let fresh: Arc<[CachedPattern<P>]> = Arc::from(compiled);
        *self.snapshot.write() = fresh;
        count
    }

    /// Rebuild this set from `source`.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn reload(&self, source: &dyn PatternSource) -> Result<usize, DbError> {
        let _guard = self.reload_guard.lock().await;

        let result = source.fetch_patterns(self.kind).await;
        crate::metrics::record_cache_reload(self.kind.name(), result.is_ok());

        let count = self.replace(result?);
        crate::metrics::set_cache_size(self.kind.name(), count);
        debug!(set = %self.kind, count, "Pattern set reloaded");
        Ok(count)
    }
}

/// The engine's three pattern sets.
pub struct PatternCache {
    pub whitelist: PatternSet<IpPattern>,
    pub banned: PatternSet<IpPattern>,
    pub autoban_paths: PatternSet<PathPattern>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCache {
    /// Create a cache with three empty sets.
    pub fn new() -> Self {
        Self {
            whitelist: PatternSet::new(RuleKind::WhitelistIp),
            banned: PatternSet::new(RuleKind::BannedIp),
            autoban_paths: PatternSet::new(RuleKind::AutoBanPath),
        }
    }

    /// Reload the set holding `kind`.
    pub async fn reload(&self, kind: RuleKind, source: &dyn PatternSource) -> Result<usize, DbError> {
        match kind {
            RuleKind::WhitelistIp => self.whitelist.reload(source).await,
            RuleKind::BannedIp => self.banned.reload(source).await,
            RuleKind::AutoBanPath => self.autoban_paths.reload(source).await,
        }
    }

    /// Reload the set holding `kind`, keeping the old snapshot on failure.
    ///
    /// Used after runtime mutations, where a failed reload must not fail the
    /// operation that already committed.
    pub async fn reload_or_keep(&self, kind: RuleKind, source: &dyn PatternSource) {
        if let Err(e) = self.reload(kind, source).await {
            warn!(set = %kind, error = %e, "Pattern reload failed, keeping previous snapshot");
        }
    }

    /// Reload all three sets, one after another.
    pub async fn reload_all(&self, source: &dyn PatternSource) -> Result<(), DbError> {
        for kind in RuleKind::ALL {
            self.reload(kind, source).await?;
        }
        Ok(())
    }
}

/// Spawn a task that reloads every set on a fixed interval.
///
/// Picks up rules written by processes other than this one.
pub fn spawn_refresh_task(
    cache: Arc<PatternCache>,
    source: Arc<dyn PatternSource>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; startup already loaded everything.
        interval.tick().await;

        loop {
            interval.tick().await;
            for kind in RuleKind::ALL {
                cache.reload_or_keep(kind, source.as_ref()).await;
            }
        }
    })
}
