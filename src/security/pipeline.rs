//! Per-request access decision.
//!
//! Checks run in a fixed order and the first applicable one wins:
//!
//! 1. Resolve the client IP (`X-Forwarded-For`, `X-Real-IP`, remote address).
//! 2. Whitelisted IP: allow, skipping everything below. A whitelist entry
//!    beats a ban on the same IP.
//! 3. Banned IP: deny. No database write.
//! 4. Auto-ban path: privileged callers are allowed; anyone else is banned
//!    and denied.
//! 5. Otherwise allow.
//!
//! The ban check and the auto-ban check each have a runtime toggle. A
//! disabled step is skipped (fail open).
//!
//! A failed auto-ban write is the one error that does not fail open: the
//! path already matched a forbidden rule, so that request is still denied
//! and only the ban row is lost.

use crate::security::auto_ban::{AutoBanCoordinator, BanOutcome};
use crate::security::exemption::ExemptionResolver;
use crate::security::pattern_cache::PatternCache;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// What the pipeline needs to know about a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Resolved client IP, `None` when no source yielded one.
    pub ip: Option<String>,
    /// Request path without the query string.
    pub path: String,
    /// Session token presented by the caller, if any.
    pub session_token: Option<String>,
}

/// Why a request was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// Both checks are switched off.
    Disabled,
    /// The client IP is whitelisted.
    Whitelisted,
    /// The path is an auto-ban trigger but the caller is privileged.
    Exempt,
    /// Nothing matched.
    NoMatch,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    /// The client IP matched a ban pattern.
    Deny { pattern: String },
    /// The path matched an auto-ban pattern; `ban` is what storage did,
    /// `None` when the write failed or no IP was known.
    AutoBan {
        pattern: String,
        ban: Option<BanOutcome>,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// Label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow(AllowReason::Disabled) => "allow_disabled",
            Decision::Allow(AllowReason::Whitelisted) => "allow_whitelisted",
            Decision::Allow(AllowReason::Exempt) => "allow_exempt",
            Decision::Allow(AllowReason::NoMatch) => "allow",
            Decision::Deny { .. } => "deny_banned",
            Decision::AutoBan { .. } => "deny_autoban",
        }
    }
}

/// Runtime switches for the two enforcement steps.
#[derive(Debug)]
pub struct FeatureToggles {
    ban_check: AtomicBool,
    auto_ban: AtomicBool,
}

impl FeatureToggles {
    pub fn new(ban_check: bool, auto_ban: bool) -> Self {
        Self {
            ban_check: AtomicBool::new(ban_check),
            auto_ban: AtomicBool::new(auto_ban),
        }
    }

    pub fn ban_check(&self) -> bool {
        self.ban_check.load(Ordering::Relaxed)
    }

    pub fn auto_ban(&self) -> bool {
        self.auto_ban.load(Ordering::Relaxed)
    }

    pub fn set_ban_check(&self, enabled: bool) {
        self.ban_check.store(enabled, Ordering::Relaxed);
    }

    pub fn set_auto_ban(&self, enabled: bool) {
        self.auto_ban.store(enabled, Ordering::Relaxed);
    }
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Composes the pattern cache, exemption resolver and auto-ban coordinator.
pub struct AccessDecisionPipeline {
    cache: Arc<PatternCache>,
    auto_ban: Arc<AutoBanCoordinator>,
    exemption: Arc<dyn ExemptionResolver>,
    toggles: Arc<FeatureToggles>,
}

impl AccessDecisionPipeline {
    pub fn new(
        cache: Arc<PatternCache>,
        auto_ban: Arc<AutoBanCoordinator>,
        exemption: Arc<dyn ExemptionResolver>,
        toggles: Arc<FeatureToggles>,
    ) -> Self {
        Self {
            cache,
            auto_ban,
            exemption,
            toggles,
        }
    }

    pub fn toggles(&self) -> &FeatureToggles {
        &self.toggles
    }

    /// Decide what to do with a request.
    pub async fn evaluate(&self, ctx: &RequestContext) -> Decision {
        let ban_check = self.toggles.ban_check();
        let auto_ban = self.toggles.auto_ban();

        if !ban_check && !auto_ban {
            return Decision::Allow(AllowReason::Disabled);
        }

        let ip = ctx.ip.as_deref();

        if let Some(ip) = ip
            && let Some(pattern) = self.cache.whitelist.find_match(ip)
        {
            debug!(ip = %ip, path = %ctx.path, pattern = %pattern, "Whitelisted client allowed");
            return Decision::Allow(AllowReason::Whitelisted);
        }

        if ban_check
            && let Some(ip) = ip
            && let Some(pattern) = self.cache.banned.find_match(ip)
        {
            info!(ip = %ip, path = %ctx.path, pattern = %pattern, "Banned client denied");
            return Decision::Deny { pattern };
        }

        if auto_ban && let Some(pattern) = self.cache.autoban_paths.find_match(&ctx.path) {
            return self.handle_autoban_hit(ctx, pattern).await;
        }

        Decision::Allow(AllowReason::NoMatch)
    }

    async fn handle_autoban_hit(&self, ctx: &RequestContext, pattern: String) -> Decision {
        let ip_label = ctx.ip.as_deref().unwrap_or("-");

        if self.exemption.is_exempt(ctx).await {
            debug!(ip = %ip_label, path = %ctx.path, pattern = %pattern, "Privileged caller hit auto-ban path, not banning");
            return Decision::Allow(AllowReason::Exempt);
        }

        let Some(ip) = ctx.ip.as_deref() else {
            warn!(path = %ctx.path, pattern = %pattern, "Auto-ban path hit without a client IP, denying without ban");
            return Decision::AutoBan { pattern, ban: None };
        };

        let ban = match self.auto_ban.create_ban(ip, &ctx.path, &pattern).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(ip = %ip, path = %ctx.path, pattern = %pattern, error = %e, "Failed to store auto-ban");
                None
            }
        };

        warn!(ip = %ip, path = %ctx.path, pattern = %pattern, "Auto-ban path hit, request denied");
        Decision::AutoBan { pattern, ban }
    }
}

/// Pick the client IP from forwarding headers or the peer address.
///
/// Priority: first comma segment of `X-Forwarded-For`, then `X-Real-IP`,
/// then the remote address with any port removed. Blank values are skipped.
pub fn resolve_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    remote_addr: Option<&str>,
) -> Option<String> {
    let first_hop = forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = first_hop {
        return Some(ip.to_string());
    }

    if let Some(ip) = real_ip.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(ip.to_string());
    }

    remote_addr
        .map(strip_port)
        .filter(|v| !v.is_empty())
}

/// Remove a trailing `:port` from an address, handling bracketed IPv6.
pub fn strip_port(addr: &str) -> String {
    let addr = addr.trim();

    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return sock.ip().to_string();
    }
    if addr.parse::<IpAddr>().is_ok() {
        return addr.to_string();
    }

    let host = match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
            if port.chars().all(|c| c.is_ascii_digit()) {
                host
            } else {
                addr
            }
        }
        _ => addr,
    };

    host.trim_start_matches('[').trim_end_matches(']').to_string()
}
