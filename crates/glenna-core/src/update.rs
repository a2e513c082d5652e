//! The check-and-update cycle run on every timer tick.
//!
//! One tick: fetch the published checksum, hash the local plugin, and
//! install the remote build when they differ. Every failure is written to
//! the event sink and ends the tick; nothing is retried until the next one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::checksum;
use crate::config::{GlennaConfig, HashAlgorithm};
use crate::event_log::EventSink;
use crate::fetch::{self, HttpOptions};
use crate::install;

/// Where the published build lives.
#[derive(Debug, Clone)]
pub struct RemoteDescriptor {
    pub checksum_url: String,
    pub payload_url: String,
    /// Filename printed after the digest in the checksum line.
    pub checksum_filename: String,
}

/// Which step of a tick failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStep {
    ChecksumFetch,
    ChecksumFormat,
    LocalDigest,
    Install,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    UpToDate,
    Installed { bytes: u64 },
    /// Another tick was still running.
    Skipped,
    Failed(FailedStep),
}

/// Clears the in-progress flag when dropped.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct UpdateLoop {
    remote: RemoteDescriptor,
    target: PathBuf,
    algorithm: HashAlgorithm,
    http: HttpOptions,
    sink: Arc<dyn EventSink>,
    in_progress: AtomicBool,
}

impl UpdateLoop {
    pub fn new(
        remote: RemoteDescriptor,
        target: PathBuf,
        algorithm: HashAlgorithm,
        http: HttpOptions,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            remote,
            target,
            algorithm,
            http,
            sink,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn from_config(cfg: &GlennaConfig, sink: Arc<dyn EventSink>) -> Self {
        let remote = RemoteDescriptor {
            checksum_url: cfg.checksum_url.clone(),
            payload_url: cfg.payload_url.clone(),
            checksum_filename: cfg.checksum_filename.clone(),
        };
        Self::new(
            remote,
            cfg.target_path.clone(),
            cfg.hash_algorithm,
            HttpOptions::from(cfg),
            sink,
        )
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    fn try_begin(&self) -> Option<TickGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TickGuard(&self.in_progress))
    }

    /// Run one full check-and-update cycle. Blocking.
    ///
    /// Returns `Skipped` without touching the network or the target when a
    /// previous tick has not finished yet.
    pub fn on_tick(&self) -> TickOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::warn!("previous update check still running; skipping tick");
            return TickOutcome::Skipped;
        };
        let outcome = self.check();
        tracing::debug!(?outcome, "tick finished");
        outcome
    }

    fn check(&self) -> TickOutcome {
        self.sink.info("Polling plugin repository.");

        let remote = match fetch::fetch_text(&self.remote.checksum_url, &self.http) {
            Ok(text) => checksum::normalize_remote(&text, &self.remote.checksum_filename),
            Err(e) => {
                self.sink.error(&e.to_string());
                return TickOutcome::Failed(FailedStep::ChecksumFetch);
            }
        };
        if let Err(e) = checksum::validate_digest(&remote, self.algorithm) {
            self.sink.error(&format!("{:#}", e));
            return TickOutcome::Failed(FailedStep::ChecksumFormat);
        }

        let local = match checksum::digest_path(&self.target, self.algorithm) {
            Ok(d) => d,
            Err(e) => {
                self.sink.error(&format!("{:#}", e));
                return TickOutcome::Failed(FailedStep::LocalDigest);
            }
        };

        if checksum::digests_match(&remote, &local) {
            self.sink.info("Installed plugin is the most recent version");
            return TickOutcome::UpToDate;
        }

        tracing::debug!(%remote, %local, "checksum mismatch");
        self.install()
    }

    /// Replace the target with the remote payload.
    pub fn install(&self) -> TickOutcome {
        self.sink.info("Fetching most recent version of plugin");
        match install::install_payload(&self.remote.payload_url, &self.target, &self.http) {
            Ok(bytes) => {
                self.sink.info("Installed the latest build of plugin");
                TickOutcome::Installed { bytes }
            }
            Err(e) => {
                self.sink.error(&e.to_string());
                TickOutcome::Failed(FailedStep::Install)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::{EntryKind, MemoryLog};

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn unreachable_loop(target: PathBuf, log: Arc<MemoryLog>) -> UpdateLoop {
        let port = closed_port();
        let remote = RemoteDescriptor {
            checksum_url: format!("http://127.0.0.1:{}/d3d9.dll.md5sum", port),
            payload_url: format!("http://127.0.0.1:{}/d3d9.dll", port),
            checksum_filename: "x64/d3d9.dll".into(),
        };
        UpdateLoop::new(remote, target, HashAlgorithm::Md5, HttpOptions::default(), log)
    }

    #[test]
    fn unreachable_checksum_logs_one_error_and_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("d3d9.dll");
        std::fs::write(&target, b"installed build").unwrap();
        let log = Arc::new(MemoryLog::new());
        let ul = unreachable_loop(target.clone(), Arc::clone(&log));

        assert_eq!(ul.on_tick(), TickOutcome::Failed(FailedStep::ChecksumFetch));
        assert_eq!(log.count(EntryKind::Error), 1);
        assert_eq!(std::fs::read(&target).unwrap(), b"installed build");
    }

    #[test]
    fn tick_is_skipped_while_another_runs() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(MemoryLog::new());
        let ul = unreachable_loop(dir.path().join("d3d9.dll"), Arc::clone(&log));

        let guard = ul.try_begin().expect("first tick");
        assert_eq!(ul.on_tick(), TickOutcome::Skipped);
        assert!(log.entries().is_empty());
        drop(guard);

        assert_ne!(ul.on_tick(), TickOutcome::Skipped);
    }

    #[test]
    fn from_config_copies_endpoints() {
        let mut cfg = GlennaConfig::default();
        cfg.target_path = PathBuf::from("/tmp/gw2/d3d9.dll");
        let ul = UpdateLoop::from_config(&cfg, Arc::new(MemoryLog::new()));
        assert_eq!(ul.target(), Path::new("/tmp/gw2/d3d9.dll"));
        assert_eq!(ul.remote.checksum_url, cfg.checksum_url);
        assert_eq!(ul.remote.checksum_filename, "x64/d3d9.dll");
    }
}
