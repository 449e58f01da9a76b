//! Prometheus metrics collection for sentinel.
//!
//! Exposed on `/metrics`:
//!
//! - `sentinel_decisions_total{decision}` - Request decisions by outcome
//! - `sentinel_auto_bans_total` - Ban rows written by auto-ban path hits
//! - `sentinel_cache_reloads_total{set, result}` - Pattern set reloads
//! - `sentinel_cache_patterns{set}` - Patterns in each published snapshot
//! - `sentinel_decision_duration_seconds` - Time spent deciding one request

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Request decisions by outcome label.
pub static DECISIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Ban rows created by the auto-ban coordinator.
pub static AUTO_BANS: OnceLock<IntCounter> = OnceLock::new();

/// Pattern set reloads by set and result.
pub static CACHE_RELOADS: OnceLock<IntCounterVec> = OnceLock::new();

/// Patterns in each published snapshot.
pub static CACHE_PATTERNS: OnceLock<IntGaugeVec> = OnceLock::new();

/// Decision latency.
pub static DECISION_LATENCY: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(DECISIONS, IntCounterVec::new(Opts::new("sentinel_decisions_total", "Request decisions by outcome"), &["decision"]));
    register!(AUTO_BANS, IntCounter::new("sentinel_auto_bans_total", "Bans created by auto-ban path hits"));
    register!(CACHE_RELOADS, IntCounterVec::new(Opts::new("sentinel_cache_reloads_total", "Pattern set reloads"), &["set", "result"]));
    register!(CACHE_PATTERNS, IntGaugeVec::new(Opts::new("sentinel_cache_patterns", "Patterns in each published snapshot"), &["set"]));
    register!(DECISION_LATENCY, Histogram::with_opts(
        HistogramOpts::new("sentinel_decision_duration_seconds", "Time spent deciding one request")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record one request decision and how long it took.
#[inline]
pub fn record_decision(label: &str, duration_secs: f64) {
    if let Some(c) = DECISIONS.get() {
        c.with_label_values(&[label]).inc();
    }
    if let Some(h) = DECISION_LATENCY.get() {
        h.observe(duration_secs);
    }
}

#[inline]
pub fn record_auto_ban() {
    if let Some(c) = AUTO_BANS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_cache_reload(set: &str, ok: bool) {
    if let Some(c) = CACHE_RELOADS.get() {
        let result = if ok { "ok" } else { "error" };
        c.with_label_values(&[set, result]).inc();
    }
}

#[inline]
pub fn set_cache_size(set: &str, count: usize) {
    if let Some(g) = CACHE_PATTERNS.get() {
        g.with_label_values(&[set]).set(count as i64);
    }
}
