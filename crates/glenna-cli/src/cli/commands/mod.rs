//! CLI command handlers. Each command is in its own file.

mod check;
mod checksum;
mod config;
mod run;

pub use check::run_check;
pub use checksum::run_checksum;
pub use config::run_config;
pub use run::run_service;
