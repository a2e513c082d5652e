//! File digests and parsing of published checksum lines.
//!
//! Digests are a content-equality fingerprint only. A published line looks
//! like `md5sum` output: `<hex-digest>  <filename>`.

use crate::config::HashAlgorithm;
use anyhow::{Context, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Hash a file with any RustCrypto digest and return lowercase hex.
/// Reads in chunks to keep memory use bounded.
pub fn hash_file<D: Digest>(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = D::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute MD5 of a file as lowercase hex.
pub fn md5_path(path: &Path) -> Result<String> {
    hash_file::<Md5>(path)
}

/// Compute SHA-256 of a file as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String> {
    hash_file::<Sha256>(path)
}

pub fn digest_path(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => md5_path(path),
        HashAlgorithm::Sha256 => sha256_path(path),
    }
}

/// Strip the expected filename token and surrounding whitespace from a
/// published checksum line. Applying it twice yields the same string.
pub fn normalize_remote(text: &str, filename_token: &str) -> String {
    let stripped = if filename_token.is_empty() {
        text.to_string()
    } else {
        text.replace(filename_token, "")
    };
    stripped.trim().to_string()
}

/// Case-insensitive comparison of two hex digests.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Check that a normalized remote digest is plain hex of the expected length.
/// Anything else means the published format changed.
pub fn validate_digest(digest: &str, algorithm: HashAlgorithm) -> Result<()> {
    if digest.len() != algorithm.hex_len() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        anyhow::bail!(
            "unexpected checksum format: expected {} hex chars, got {:?}",
            algorithm.hex_len(),
            digest
        );
    }
    Ok(())
}
