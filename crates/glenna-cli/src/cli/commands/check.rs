//! `glenna check` – one update check, outcome printed to stdout.

use anyhow::Result;
use glenna_core::config::GlennaConfig;
use glenna_core::event_log::EventLog;
use glenna_core::update::{TickOutcome, UpdateLoop};
use std::sync::Arc;

pub async fn run_check(cfg: &GlennaConfig) -> Result<()> {
    let update = UpdateLoop::from_config(cfg, Arc::new(EventLog::new()));
    let target = cfg.target_path.clone();
    let outcome = tokio::task::spawn_blocking(move || update.on_tick()).await?;

    match outcome {
        TickOutcome::UpToDate => println!("{} is up to date", target.display()),
        TickOutcome::Installed { bytes } => {
            println!("installed latest build to {} ({} bytes)", target.display(), bytes)
        }
        TickOutcome::Skipped => println!("another update check is running"),
        TickOutcome::Failed(step) => {
            anyhow::bail!("update check failed ({:?}); see the log for details", step)
        }
    }
    Ok(())
}
