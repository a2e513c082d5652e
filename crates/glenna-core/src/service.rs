//! Service lifecycle: run state and the interval timer driving update ticks.
//!
//! `Service::start` returns as soon as the timer is armed. Each tick runs on
//! the blocking pool; `ServiceHandle::stop` waits for in-flight ticks.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::MAX_INTERVAL_SECS;
use crate::update::{TickOutcome, UpdateLoop};

const MIN_PERIOD: Duration = Duration::from_millis(1);
const MAX_PERIOD: Duration = Duration::from_secs(MAX_INTERVAL_SECS);

/// Run state as reported to the host service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Stopped = 1,
    StartPending = 2,
    StopPending = 3,
    Running = 4,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            2 => RunState::StartPending,
            3 => RunState::StopPending,
            4 => RunState::Running,
            _ => RunState::Stopped,
        }
    }

    /// The only state that may precede `self`.
    fn predecessor(self) -> RunState {
        match self {
            RunState::StartPending => RunState::Stopped,
            RunState::Running => RunState::StartPending,
            RunState::StopPending => RunState::Running,
            RunState::Stopped => RunState::StopPending,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid service state transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Current run state, shared between the control side and the timer task.
#[derive(Debug)]
pub struct ServiceStatus {
    state: AtomicU8,
}

impl ServiceStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(RunState::Stopped as u8),
        }
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` from its single allowed predecessor and report it.
    pub fn transition(&self, to: RunState) -> Result<(), InvalidTransition> {
        let from = to.predecessor();
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|actual| InvalidTransition {
                from: RunState::from_u8(actual),
                to,
            })?;
        report_status(to);
        Ok(())
    }
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand the new state to the host service manager. Only logged for now.
fn report_status(state: RunState) {
    let code = state as u8;
    tracing::debug!(?state, code, "service status reported");
}

pub struct Service;

impl Service {
    /// Mark the service running, log the startup entry and arm the timer.
    /// The first tick fires one `period` after start. Must be called from
    /// within a tokio runtime.
    pub fn start(update: Arc<UpdateLoop>, period: Duration) -> Result<ServiceHandle, InvalidTransition> {
        let period = timer_period(period);
        let status = Arc::new(ServiceStatus::new());
        status.transition(RunState::StartPending)?;
        status.transition(RunState::Running)?;
        update.sink().info("Glenna service has started.");
        tracing::info!(period_secs = period.as_secs_f64(), path = %update.target().display(), "update timer armed");

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_timer(Arc::clone(&update), period, stop_rx));
        Ok(ServiceHandle {
            status,
            update,
            stop_tx,
            task,
        })
    }
}

/// Clamp the tick period to what the timer can arm.
fn timer_period(period: Duration) -> Duration {
    let clamped = period.clamp(MIN_PERIOD, MAX_PERIOD);
    if clamped != period {
        tracing::warn!(
            requested_secs = period.as_secs_f64(),
            used_secs = clamped.as_secs_f64(),
            "update interval out of range; clamped"
        );
    }
    clamped
}

async fn run_timer(update: Arc<UpdateLoop>, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let now = Instant::now();
    let mut interval = match now.checked_add(period) {
        Some(first) => tokio::time::interval_at(first, period),
        None => tokio::time::interval(period),
    };
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inflight: JoinSet<TickOutcome> = JoinSet::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let update = Arc::clone(&update);
                inflight.spawn_blocking(move || update.on_tick());
            }
            Some(res) = inflight.join_next(), if !inflight.is_empty() => {
                log_join(res);
            }
            _ = stop_rx.changed() => break,
        }
    }

    while let Some(res) = inflight.join_next().await {
        log_join(res);
    }
    tracing::debug!("update timer stopped");
}

fn log_join(res: Result<TickOutcome, tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::error!("update tick did not complete: {}", e);
    }
}

/// Control side of a started service.
pub struct ServiceHandle {
    status: Arc<ServiceStatus>,
    update: Arc<UpdateLoop>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn state(&self) -> RunState {
        self.status.state()
    }

    pub fn status(&self) -> Arc<ServiceStatus> {
        Arc::clone(&self.status)
    }

    /// Log the shutdown entry, disarm the timer and wait for any tick still running.
    pub async fn stop(self) -> Result<RunState, InvalidTransition> {
        self.status.transition(RunState::StopPending)?;
        self.update.sink().info("Glenna service is stopping.");
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("update timer task failed: {}", e);
        }
        self.status.transition(RunState::Stopped)?;
        Ok(self.status.state())
    }
}
