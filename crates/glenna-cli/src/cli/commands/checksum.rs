//! Checksum command: print the digest of a file.

use anyhow::Result;
use glenna_core::checksum;
use glenna_core::config::HashAlgorithm;
use std::path::Path;

/// Compute and print the digest of the given file.
pub async fn run_checksum(path: &Path, algorithm: HashAlgorithm) -> Result<()> {
    let digest = checksum::digest_path(path, algorithm)?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
