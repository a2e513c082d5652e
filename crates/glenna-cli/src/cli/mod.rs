//! CLI for the glenna plugin updater.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use glenna_core::config::{self, GlennaConfig, HashAlgorithm};
use std::path::PathBuf;

use commands::{run_check, run_checksum, run_config, run_service};

/// Top-level CLI for the glenna plugin updater.
#[derive(Debug, Parser)]
#[command(name = "glenna")]
#[command(about = "glenna: keeps a game plugin in sync with its published build", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/glenna/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the updater in the foreground until SIGINT/SIGTERM.
    Run,

    /// Run a single update check now and exit.
    Check,

    /// Compute the digest of a file, in `md5sum` output format.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Hash algorithm: md5 or sha256.
        #[arg(long, default_value = "md5")]
        algorithm: HashAlgorithm,
    },

    /// Print the effective configuration as TOML.
    Config {
        /// Print only the path of the config file.
        #[arg(long)]
        path: bool,
    },
}

fn load_config(explicit: Option<&PathBuf>) -> Result<(GlennaConfig, PathBuf)> {
    match explicit {
        Some(path) => Ok((config::load_from_path(path)?, path.clone())),
        None => Ok((config::load_or_init()?, config::config_path()?)),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // checksum works on any file and needs no config.
        if let CliCommand::Checksum { path, algorithm } = &cli.command {
            return run_checksum(path, *algorithm).await;
        }

        let (cfg, cfg_path) = load_config(cli.config.as_ref())?;
        tracing::debug!("loaded config from {}: {:?}", cfg_path.display(), cfg);

        match cli.command {
            CliCommand::Run => run_service(&cfg).await?,
            CliCommand::Check => run_check(&cfg).await?,
            CliCommand::Config { path } => run_config(&cfg, &cfg_path, path)?,
            CliCommand::Checksum { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
