//! Shutdown signal handling

use anyhow::Context;
use tracing::info;

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { tokio::signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    Ok(())
}
