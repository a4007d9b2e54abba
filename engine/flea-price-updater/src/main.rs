use anyhow::Context;
use flea_price_updater::{HostServices, HostTables, NoopRegenerator, PriceUpdateScheduler, ServiceSettings};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    info!("Starting Flea Price Updater");

    let settings = ServiceSettings::from_env().context("Failed to load settings")?;
    info!("Loaded settings: {:?}", settings);

    let tables = HostTables::load_from_file(&settings.host_database)
        .await
        .with_context(|| format!("Failed to load host tables from {:?}", settings.host_database))?;
    let host = HostServices::new(tables, Arc::new(NoopRegenerator));

    let mut scheduler = PriceUpdateScheduler::new(&settings, host)
        .await
        .context("Failed to create scheduler")?;
    scheduler.start().await.context("Startup flea price update failed")?;

    tokio::select! {
        _ = scheduler.schedule().cancelled() => {
            warn!("Flea price updates cancelled, exiting");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
