//! Integration test common infrastructure.
//!
//! Builds a guarded router over an in-memory database and sends requests
//! through it without binding a socket.

use axum::Router;
use axum::body::Body;
use axum::routing::get;
use http::{Request, StatusCode};
use sentinel::Sentinel;
use sentinel::config::Config;
use sentinel::db::Database;
use sentinel::http::{GuardState, protect};
use sentinel::security::ExemptionResolver;
use std::sync::Arc;
use tower::ServiceExt;

pub const DENY_MESSAGE: &str = "Access denied.";

/// A running engine plus the guarded application in front of it.
pub struct TestApp {
    pub sentinel: Sentinel,
    pub app: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Database::new(":memory:").await.unwrap();
        let sentinel = Sentinel::start(db, &config).await.unwrap();
        Self::wrap(sentinel, &config)
    }

    /// Use `exemption` in place of the session-backed resolver.
    pub async fn with_exemption(exemption: Arc<dyn ExemptionResolver>) -> Self {
        let config = Config::default();
        let db = Database::new(":memory:").await.unwrap();
        let sentinel = Sentinel::start_with_exemption(db, &config, exemption)
            .await
            .unwrap();
        Self::wrap(sentinel, &config)
    }

    fn wrap(sentinel: Sentinel, config: &Config) -> Self {
        let routes = Router::new()
            .route("/", get(|| async { "home" }))
            .route("/wp-admin/login.php", get(|| async { "admin login" }))
            .fallback(|| async { (StatusCode::NOT_FOUND, "not found") });

        let state = GuardState::new(
            sentinel.pipeline.clone(),
            &config.messages.forbidden,
            &config.session.cookie_name,
        );

        Self {
            app: protect(routes, state),
            sentinel,
        }
    }

    /// Send a GET from `ip`, optionally with a session cookie.
    pub async fn get(&self, ip: &str, path: &str, session: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(path).header("x-forwarded-for", ip);
        if let Some(token) = session {
            builder = builder.header("cookie", format!("session_token={token}"));
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }
}
