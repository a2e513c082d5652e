//! Replacing the target file with a freshly downloaded build.
//!
//! The payload lands in `<target>.part` first and is renamed over the old
//! file once the download completed, so a failed transfer leaves it untouched
//! and the target path never goes missing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::fetch::{self, FetchError, HttpOptions};

/// Temporary file suffix used before the final rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `d3d9.dll` → `d3d9.dll.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("download failed: {0}")]
    Download(#[from] FetchError),
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Remove a file; a file that is already gone counts as removed.
fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Download `url` and put it at `target`. Returns the payload size.
pub fn install_payload(url: &str, target: &Path, opts: &HttpOptions) -> Result<u64, InstallError> {
    let part = temp_path(target);
    let result = download_and_replace(url, target, &part, opts);
    if result.is_err() {
        if let Err(e) = remove_if_exists(&part) {
            tracing::warn!(path = %part.display(), "could not clean up temp file: {}", e);
        }
    }
    result
}

fn download_and_replace(
    url: &str,
    target: &Path,
    part: &Path,
    opts: &HttpOptions,
) -> Result<u64, InstallError> {
    let bytes = fetch::download_to_path(url, part, opts)?;
    tracing::debug!(bytes, path = %part.display(), "payload downloaded");

    // Replaces an existing target in one step.
    fs::rename(part, target).map_err(|source| InstallError::Rename {
        from: part.to_path_buf(),
        to: target.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}
