//! Main entry point for the Steward server.
//!
//! Loads configuration, initializes logging and metrics descriptions, and
//! assembles the user service graph, then runs until shut down.

use clap::Parser;
use steward_cache::UserCache;
use steward_consistency::DistributedLockService;
use steward_persistence::UserPersistence;
use steward_server::{
    model::{Cli, Configuration},
    startup,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let configuration = Configuration::from_cli(&cli)?;

    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    steward_core::metrics::init_metrics();

    let services = startup::build_services(&configuration, None).await?;
    info!(
        storage_mode = %services.persistence.storage_mode(),
        "Steward server started"
    );

    startup::shutdown_signal().await?;

    let stats = services.locks.get_stats().await;
    let cache = services.cache.stats();
    info!(
        lock_acquisitions = stats.total_acquisitions,
        lock_failures = stats.failed_acquisitions,
        expired_locks = stats.expired_locks,
        cache_hit_rate = cache.hit_rate(),
        "Steward server stopped"
    );

    Ok(())
}
