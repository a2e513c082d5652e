//! `glenna run` – run the update service until asked to stop.

use anyhow::Result;
use glenna_core::config::GlennaConfig;
use glenna_core::event_log::EventLog;
use glenna_core::service::Service;
use glenna_core::update::UpdateLoop;
use std::sync::Arc;

pub async fn run_service(cfg: &GlennaConfig) -> Result<()> {
    let update = Arc::new(UpdateLoop::from_config(cfg, Arc::new(EventLog::new())));
    let handle = Service::start(update, cfg.interval())?;

    wait_for_shutdown().await?;

    let state = handle.stop().await?;
    tracing::info!(?state, "service stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C");
    Ok(())
}
