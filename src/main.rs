//! sentinel - access-control front for HTTP services.

use anyhow::Context;
use sentinel::Sentinel;
use sentinel::config::{Config, validate};
use sentinel::db::Database;
use sentinel::http::{GuardState, router, run_http_server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        listen = %config.server.listen,
        database = %config.database.path,
        ban_check = config.features.ban_check,
        auto_ban = config.features.auto_ban,
        "Starting sentinel"
    );

    sentinel::metrics::init();

    let db = Database::new(&config.database.path)
        .await
        .with_context(|| format!("opening database {}", config.database.path))?;

    // Serving without rules loaded would disable enforcement, so this is fatal.
    let sentinel = Sentinel::start(db, &config)
        .await
        .context("initial access rule load failed")?;

    let _refresh = sentinel.spawn_refresh(config.cache.refresh_interval());

    let state = GuardState::new(
        sentinel.pipeline.clone(),
        &config.messages.forbidden,
        &config.session.cookie_name,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;

    run_http_server(listener, router(state)).await?;

    info!("sentinel stopped");
    Ok(())
}
