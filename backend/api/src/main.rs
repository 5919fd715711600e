//! Escrow API — entry point.
//!
//! Wires the escrow engine to an Axum REST surface for the marketplace
//! frontend: contract creation, milestone funding/submission/release,
//! cancellation, and wallet reads. The engine owns every business rule;
//! this binary owns configuration, logging, and HTTP.

mod api;
mod config;
mod errors;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = escrow_engine::db::init_pool(&config.database_url).await?;

    let state = Arc::new(api::ApiState {
        pool,
        fee_bps: config.fee_bps,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route(
            "/contracts",
            post(api::create_contract).get(api::list_contracts),
        )
        .route("/contracts/:id", get(api::get_contract))
        .route("/contracts/:id/cancel", post(api::cancel_contract))
        .route(
            "/contracts/:id/milestones/:mid/fund",
            post(api::fund_milestone),
        )
        .route(
            "/contracts/:id/milestones/:mid/submit",
            post(api::submit_work),
        )
        .route(
            "/contracts/:id/milestones/:mid/revision",
            post(api::request_revision),
        )
        .route(
            "/contracts/:id/milestones/:mid/release",
            post(api::release_escrow),
        )
        .route("/wallets/:owner/deposit", post(api::deposit))
        .route("/wallets/:owner/:party", get(api::wallet_balance))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
