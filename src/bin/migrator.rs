use dotenvy::dotenv;
use tracing::info;
use trip_ledger::{
    infrastructure::{config::Config, db},
    telemetry,
};

/// Applies pending migrations to the configured Postgres database and exits.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let mut config = Config::from_env()?;
    telemetry::init(&config.telemetry);

    // migrations only make sense against postgres, whatever the server uses
    if config.database.url.trim().is_empty() {
        config.database.url = std::env::var("DATABASE_URL")?;
    }
    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;

    info!(max_connections = config.database.max_connections, "trip ledger migrations applied");

    Ok(())
}
