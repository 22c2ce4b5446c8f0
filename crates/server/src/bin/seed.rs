//! Populates the database with the fixture set for manual testing.
//!
//! Reads `DATABASE_URL` (and `SEED_PASSWORD` for the fixture accounts) from
//! the environment. Exits non-zero on any failure.

use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homebuild_server::{config::Config, db::Database, fixtures};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homebuild_server=info,homebuild_seed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let password = env::var("SEED_PASSWORD").unwrap_or_else(|_| "homebuilder123".to_string());

    tracing::info!("Starting fixture seeding");
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;

    let summary = fixtures::seed(&db.pool, &password).await?;

    tracing::info!(
        users = summary.users,
        projects = summary.projects,
        installments = summary.installments,
        change_requests = summary.change_requests,
        "Seeding completed"
    );
    for user in &fixtures::USERS {
        tracing::info!(
            email = user.email,
            role = user.role.as_str(),
            "Fixture account ready"
        );
    }

    Ok(())
}
