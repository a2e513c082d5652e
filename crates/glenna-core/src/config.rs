use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Checksum line published next to the arcDPS build.
pub const DEFAULT_CHECKSUM_URL: &str = "https://www.deltaconnected.com/arcdps/x64/d3d9.dll.md5sum";
/// The arcDPS build itself.
pub const DEFAULT_PAYLOAD_URL: &str = "https://www.deltaconnected.com/arcdps/x64/d3d9.dll";
/// Filename that follows the digest in the published checksum line.
pub const DEFAULT_CHECKSUM_FILENAME: &str = "x64/d3d9.dll";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
/// One week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
/// One day; applies to both the connect and the request timeout.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Hash used for both the local file and the published checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Length of the lowercase hex rendering of a digest.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => anyhow::bail!("unknown hash algorithm: {}", other),
        }
    }
}

/// Global configuration loaded from `~/.config/glenna/config.toml`.
///
/// Every field has a default, so a missing or partial file keeps the
/// stock arcDPS endpoints and a one-minute poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlennaConfig {
    /// URL serving `<hex-digest>  <filename>`.
    pub checksum_url: String,
    /// URL serving the raw plugin bytes.
    pub payload_url: String,
    /// Filename token stripped from the checksum line before comparing.
    pub checksum_filename: String,
    /// Local plugin file kept in sync with the remote build.
    pub target_path: PathBuf,
    /// Seconds between two update checks.
    pub interval_secs: u64,
    pub hash_algorithm: HashAlgorithm,
    /// Connect timeout for each HTTP request.
    pub connect_timeout_secs: u64,
    /// Overall timeout for each HTTP request (checksum fetch or payload download).
    pub request_timeout_secs: u64,
}

impl Default for GlennaConfig {
    fn default() -> Self {
        Self {
            checksum_url: DEFAULT_CHECKSUM_URL.to_string(),
            payload_url: DEFAULT_PAYLOAD_URL.to_string(),
            checksum_filename: DEFAULT_CHECKSUM_FILENAME.to_string(),
            target_path: default_target_path(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            hash_algorithm: HashAlgorithm::Md5,
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
        }
    }
}

impl GlennaConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Reject configs the update loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_http_url("checksum_url", &self.checksum_url)?;
        check_http_url("payload_url", &self.payload_url)?;
        check_range("interval_secs", self.interval_secs, MAX_INTERVAL_SECS)?;
        check_range("connect_timeout_secs", self.connect_timeout_secs, MAX_TIMEOUT_SECS)?;
        check_range("request_timeout_secs", self.request_timeout_secs, MAX_TIMEOUT_SECS)?;
        if self.target_path.as_os_str().is_empty() {
            anyhow::bail!("target_path must not be empty");
        }
        Ok(())
    }
}

fn check_range(field: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 || value > max {
        anyhow::bail!("{} must be between 1 and {}, got {}", field, max, value);
    }
    Ok(())
}

fn check_http_url(field: &str, raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).with_context(|| format!("{} is not a valid URL: {}", field, raw))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("{} must use http or https, got {}", field, other),
    }
}

#[cfg(windows)]
fn default_target_path() -> PathBuf {
    PathBuf::from(r"C:\Program Files\Guild Wars 2\bin64\d3d9.dll")
}

/// Default Wine prefix location of the game install.
#[cfg(not(windows))]
fn default_target_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".wine/drive_c/Program Files/Guild Wars 2/bin64/d3d9.dll")
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("glenna")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GlennaConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GlennaConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<GlennaConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GlennaConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
