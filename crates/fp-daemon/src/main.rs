//! fp-daemon entry point.
//!
//! Thin on purpose: load config, set up tracing, build the shared state,
//! wire middleware and start the HTTP server. Handlers live in `routes/`;
//! shared state types live in `state.rs`.

use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use anyhow::Context;
use fp_config::{
    discover_config_paths, load_settings, report_unused_keys, secrets::resolve_secrets, AppEnv,
    UnusedKeyPolicy,
};
use fp_daemon::{layers, routes, state};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

const ENV_ADDR: &str = "FANPLACE_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let env = AppEnv::from_env()?;
    let paths = discover_config_paths(Path::new("config"), env);
    let (loaded, settings) = load_settings(&paths).context("config load failed")?;
    let policy = match env {
        AppEnv::Development => UnusedKeyPolicy::Warn,
        AppEnv::Production => UnusedKeyPolicy::Fail,
    };
    let unused = report_unused_keys(&loaded.config_json, policy)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "config has unused keys");
    }
    let secrets = resolve_secrets(&settings, env)?;
    info!(env = env.as_str(), config_hash = %loaded.config_hash, "config loaded");

    let db = fp_db::connect_lazy(
        &std::env::var(fp_db::ENV_DB_URL)
            .with_context(|| format!("missing env var {}", fp_db::ENV_DB_URL))?,
    )?;

    let shared = Arc::new(state::AppState::from_settings(&settings, &secrets, env, db)?);

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    state::spawn_order_sweeper(
        Arc::clone(&shared),
        Duration::from_secs(settings.orders.sweep_interval_secs.max(1)),
        chrono::Duration::minutes(settings.orders.pending_ttl_minutes),
    );

    let app = layers::with_security_headers(routes::build_router(Arc::clone(&shared)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(layers::cors(&settings.server.cors_origins));

    let addr: SocketAddr = match std::env::var(ENV_ADDR) {
        Ok(v) if !v.trim().is_empty() => v.parse().with_context(|| format!("invalid {ENV_ADDR}"))?,
        _ => settings
            .server
            .addr
            .parse()
            .context("invalid server.addr")?,
    };
    info!(
        payments = shared.payments.name(),
        storage = shared.storage.name(),
        "fp-daemon listening on http://{}",
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("fp-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown signal received");
}
