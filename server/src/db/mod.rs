//! Database Layer
//!
//! `PostgreSQL` record store and Redis key-value connections.

pub mod kv;
pub mod memory;
mod models;
mod queries;
pub mod store;


use std::time::Duration;

use anyhow::Result;
pub use kv::{KeyValueStore, KvError, MemoryKv, RedisKv};
pub use memory::MemoryRecordStore;
pub use models::*;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
pub use store::{PgRecordStore, RecordStore, StoreError, StoreResult};
use tracing::{info, warn};

/// Upper bound on the delay between Redis reconnect attempts, in milliseconds.
const REDIS_MAX_RECONNECT_DELAY_MS: u32 = 20_000;

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(2)
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Create Redis client.
///
/// Reconnects forever with exponential backoff (50ms base, capped at 20s).
/// Connection errors are logged, never fatal.
pub async fn create_redis_client(redis_url: &str) -> Result<fred::clients::Client> {
    use fred::prelude::*;

    let config = Config::from_url(redis_url)?;
    let connection = ConnectionConfig {
        connection_timeout: Duration::from_secs(10),
        ..Default::default()
    };
    let policy = ReconnectPolicy::new_exponential(0, 50, REDIS_MAX_RECONNECT_DELAY_MS, 2);
    let client = Client::new(config, None, Some(connection), Some(policy));

    client.on_error(|(error, server)| async move {
        warn!(error = %error, server = ?server, "Redis connection error");
        Ok(())
    });

    client.connect();
    client.wait_for_connect().await?;

    info!("Connected to Redis");
    Ok(client)
}
