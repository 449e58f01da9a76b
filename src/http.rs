//! HTTP surface: the access guard middleware and the server loop.
//!
//! [`access_guard`] wraps a router via `middleware::from_fn_with_state`.
//! Allowed requests reach the inner handler unchanged; denied requests get a
//! 403 with the configured message. `/healthz` and `/metrics` sit behind the
//! same guard.

use crate::security::pipeline::{AccessDecisionPipeline, Decision, RequestContext, resolve_client_ip};
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use futures_util::FutureExt;
use http::{HeaderMap, StatusCode, header};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// State shared by the guard.
#[derive(Clone)]
pub struct GuardState {
    pipeline: Arc<AccessDecisionPipeline>,
    forbidden: Arc<str>,
    cookie_name: Arc<str>,
}

impl GuardState {
    pub fn new(pipeline: Arc<AccessDecisionPipeline>, forbidden: &str, cookie_name: &str) -> Self {
        Self {
            pipeline,
            forbidden: Arc::from(forbidden),
            cookie_name: Arc::from(cookie_name),
        }
    }
}

/// Decide whether a request may proceed.
///
/// A panic during evaluation is logged and the request is let through.
pub async fn access_guard(
    State(state): State<GuardState>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = request_context(&request, &state.cookie_name);
    let started = Instant::now();

    let decision = match AssertUnwindSafe(state.pipeline.evaluate(&ctx))
        .catch_unwind()
        .await
    {
        Ok(decision) => decision,
        Err(_) => {
            tracing::error!(path = %ctx.path, "Access evaluation panicked, allowing request");
            crate::metrics::record_decision("allow_error", started.elapsed().as_secs_f64());
            return next.run(request).await;
        }
    };

    crate::metrics::record_decision(decision.label(), started.elapsed().as_secs_f64());

    match decision {
        Decision::Allow(_) => next.run(request).await,
        Decision::Deny { .. } | Decision::AutoBan { .. } => forbidden(&state.forbidden),
    }
}

fn forbidden(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.to_string(),
    )
        .into_response()
}

/// Build the pipeline's view of a request.
fn request_context(request: &Request, cookie_name: &str) -> RequestContext {
    let headers = request.headers();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    RequestContext {
        ip: resolve_client_ip(
            header_str(headers, X_FORWARDED_FOR),
            header_str(headers, X_REAL_IP),
            remote.as_deref(),
        ),
        path: decode_path(request.uri().path()),
        session_token: cookie_value(headers, cookie_name),
    }
}

/// Percent-decode a request path so rules see what the application serves.
///
/// Invalid UTF-8 after decoding is replaced, never rejected.
fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Find a cookie by name across all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Wrap `router` in the access guard.
///
/// Routes and fallback must be added before calling this.
pub fn protect(router: Router, state: GuardState) -> Router {
    router.layer(middleware::from_fn_with_state(state, access_guard))
}

/// The built-in endpoints, guarded.
pub fn router(state: GuardState) -> Router {
    let routes = Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found);
    protect(routes, state)
}

/// Serve `app` until Ctrl-C.
///
/// Peer addresses are attached so the guard can fall back to them when no
/// forwarding header is present.
pub async fn run_http_server(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP server listening");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
