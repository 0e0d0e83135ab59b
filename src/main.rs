//! Pin Server - Main Entry Point
//!
//! Pinning-service daemon sitting between HTTP clients and a
//! content-addressed storage backend.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

mod api;
mod auth;
mod backend;
mod config;
mod db;
mod pin;

use backend::HttpPinBackend;
use pin::{PinHandler, PinQueue};

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pin_server=debug,tower_http=debug".into())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting pin server"
    );

    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    let backend: Arc<dyn backend::PinBackend> = Arc::new(HttpPinBackend::new(
        config.backend_url.clone(),
        config.backend_timeout,
    ));

    let queue = PinQueue::start(db_pool.clone(), Arc::clone(&backend)).await?;
    info!("pin queue started, rehydration complete");

    let handler = PinHandler::new(db_pool.clone(), Arc::clone(&backend), queue.clone());
    let state = api::AppState::new(db_pool, config.clone(), handler);

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "server listening");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C signal handler");
        info!("received shutdown signal, draining pin queue...");
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    queue.stop().await;
    info!("server shutdown complete");

    Ok(())
}
