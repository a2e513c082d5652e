//! `glenna config` – show the effective configuration.

use anyhow::Result;
use glenna_core::config::GlennaConfig;
use std::path::Path;

pub fn run_config(cfg: &GlennaConfig, cfg_path: &Path, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", cfg_path.display());
    } else {
        print!("{}", toml::to_string_pretty(cfg)?);
    }
    Ok(())
}
