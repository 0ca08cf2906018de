//! Schoolgate Server - Main Entry Point

use std::sync::Arc;

use anyhow::Result;
use fred::prelude::*;
use tracing::info;

use sg_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sg_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = config.service_name.as_deref().unwrap_or("sg-server"),
        "Starting Schoolgate Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    // Initialize Redis
    let redis = db::create_redis_client(&config.redis_url).await?;

    // Build application state
    let records = Arc::new(db::PgRecordStore::new(db_pool.clone()));
    let kv = Arc::new(db::RedisKv::new(redis.clone()));
    let state = api::AppState::new(records, kv, config.clone());

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Tear down store handles
    redis.quit().await?;
    db_pool.close().await;

    info!("Server shutdown complete");

    Ok(())
}
