mod api;
mod config;
mod ledger_http;
mod routes_datasets;
mod routes_royalty;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use royalty::JsonFileStore;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::ledger_http::HttpLedgerClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    let store = JsonFileStore::new(&cfg.data_path)
        .with_context(|| format!("Failed to open dataset store at {}", cfg.data_path))?;

    let ledger = HttpLedgerClient::new(
        cfg.ledger_url.clone(),
        Duration::from_secs(cfg.confirm_timeout_secs),
        Duration::from_millis(cfg.confirm_poll_ms),
    );

    // --- Startup health checks (fail fast) ---
    ledger
        .ping()
        .await
        .with_context(|| format!("Ledger node unreachable at {}", cfg.ledger_url))?;
    info!("ledger: ok ({})", cfg.ledger_url);

    let app_state = Arc::new(AppState::new(ledger, store));

    let app = Router::new()
        .route("/datasets", post(routes_datasets::post_dataset))
        .route("/datasets", get(routes_datasets::get_datasets))
        .route("/datasets/:id", get(routes_datasets::get_dataset))
        .route(
            "/royalty/:id/contributors",
            get(routes_royalty::get_contributors),
        )
        .route(
            "/royalty/:id/contributors",
            post(routes_royalty::post_contributor),
        )
        .route(
            "/royalty/:id/contributors/:address",
            patch(routes_royalty::patch_contributor),
        )
        .route(
            "/royalty/:id/contributors/:address",
            delete(routes_royalty::delete_contributor),
        )
        .route(
            "/royalty/:id/contributors/:address/rewards",
            get(routes_royalty::get_contributor_rewards),
        )
        .route("/royalty/:id/usage", post(routes_royalty::post_usage))
        .route("/royalty/:id/usage", get(routes_royalty::get_usage))
        .route(
            "/royalty/rewards/:address",
            get(routes_royalty::get_user_rewards),
        )
        .route("/royalty/:id/distribute", post(routes_royalty::post_distribute))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = &cfg.bind_addr;
    println!("gateway listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
