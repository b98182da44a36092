//! Instrument Reference-Data Service daemon
//!
//! Keeps the in-memory instrument catalog fresh on the daily schedule and
//! exposes it to in-process collaborators via the lookup API.

use anyhow::{Context, Result};
use refdata::{InstrumentService, RefdataConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refdata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Instrument Reference-Data Service");

    let config = RefdataConfig::from_env();
    let service =
        InstrumentService::new(config).context("Failed to create instrument service")?;
    service.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let stats = service.stats().await;
    info!(
        "Catalog at shutdown: {} instruments across {} underlyings",
        stats.total_instruments, stats.underlying_count
    );

    Ok(())
}
