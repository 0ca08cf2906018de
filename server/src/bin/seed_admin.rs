//! Seed the permission catalog, the `SUPER_ADMIN` role and the first super
//! admin from `DEFAULT_EMAIL` / `DEFAULT_PASSWORD`.

use anyhow::{Context, Result};
use tracing::info;

use sg_server::auth::password::PasswordPolicy;
use sg_server::{config, db, seed};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sg_server=info".into()),
        )
        .json()
        .init();

    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;
    let email = std::env::var("DEFAULT_EMAIL").context("DEFAULT_EMAIL must be set")?;
    let password = std::env::var("DEFAULT_PASSWORD").context("DEFAULT_PASSWORD must be set")?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let records = db::PgRecordStore::new(pool.clone());

    let report = seed::seed_super_admin(
        &records,
        &email,
        &password,
        PasswordPolicy::new(config.password_min_length),
    )
    .await?;

    info!(
        permissions_created = report.permissions_created,
        role_created = report.role_created,
        admin_created = report.admin_created,
        "Seed complete"
    );

    pool.close().await;
    Ok(())
}
