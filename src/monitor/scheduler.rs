//! Monitor scheduler
//!
//! Drives cycles on a fixed cadence:
//!
//! ```text
//! Idle -> Authenticating -> Cycling -> Waiting -> (Authenticating | Stopped)
//! ```
//!
//! A fresh session is opened for every cycle. Session and cycle errors are
//! logged and the loop carries on; only the stop signal (or single-cycle
//! mode) ends it. A single pass runs even if a stop was already requested.
//! The interval is a target cadence: time spent in a cycle is subtracted
//! from the following wait.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use super::cycle::CycleRunner;
use super::session::SessionProvider;
use super::stop::StopSignal;
use crate::alert::{Alerter, CycleObserver};
use crate::clock::Clock;
use crate::domain::{CycleResult, SiteSpec};
use crate::error::{Result, WatchError};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Authenticating,
    Cycling,
    Waiting,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::Authenticating => "authenticating",
            MonitorState::Cycling => "cycling",
            MonitorState::Waiting => "waiting",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Continuous monitoring or a single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Continuous,
}

/// Timing for the scheduler
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Target time between cycle starts
    pub interval: Duration,
    /// Budget for each site check
    pub per_site_timeout: Duration,
    /// Granularity of stop-signal checks while waiting
    pub stop_poll: Duration,
    pub mode: RunMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            per_site_timeout: Duration::from_secs(30),
            stop_poll: Duration::from_secs(1),
            mode: RunMode::Continuous,
        }
    }
}

/// Counters across the life of the monitor
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MonitorStats {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub alerts_raised: u64,
}

/// The monitoring loop
pub struct Monitor {
    clock: Arc<dyn Clock>,
    session: Arc<dyn SessionProvider>,
    runner: CycleRunner,
    alerter: Alerter,
    observer: Arc<dyn CycleObserver>,
    stop: Arc<dyn StopSignal>,
    sites: Vec<SiteSpec>,
    config: MonitorConfig,
    state: MonitorState,
    stats: MonitorStats,
}

impl Monitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Arc<dyn Clock>,
        session: Arc<dyn SessionProvider>,
        runner: CycleRunner,
        alerter: Alerter,
        observer: Arc<dyn CycleObserver>,
        stop: Arc<dyn StopSignal>,
        sites: Vec<SiteSpec>,
        config: MonitorConfig,
    ) -> Result<Self> {
        if sites.is_empty() {
            return Err(WatchError::Config("at least one site is required".to_string()));
        }
        Ok(Self {
            clock,
            session,
            runner,
            alerter,
            observer,
            stop,
            sites,
            config,
            state: MonitorState::Idle,
            stats: MonitorStats::default(),
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    fn enter(&mut self, state: MonitorState) {
        if self.state != state {
            info!("Monitor {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Run until stopped (or after one cycle in single-cycle mode).
    ///
    /// Returns the last completed cycle.
    pub async fn run(&mut self) -> Option<CycleResult> {
        info!(
            "Monitor starting: {} sites, interval {:?}, mode {:?}, stop via {}",
            self.sites.len(),
            self.config.interval,
            self.config.mode,
            self.stop.describe()
        );
        let mut last = None;

        loop {
            // a single pass always runs; a leftover stop marker only ends watching
            if self.config.mode == RunMode::Continuous && self.stop.is_set() {
                info!("Stop signal observed before cycle");
                break;
            }

            let cycle_start = self.clock.now();
            match self.run_one_cycle().await {
                Ok(cycle) => {
                    self.stats.cycles_completed += 1;
                    let alert = self.alerter.evaluate(&cycle);
                    if alert.is_some() {
                        self.stats.alerts_raised += 1;
                    }
                    self.observer.on_cycle(&cycle, alert.as_ref());
                    last = Some(cycle);
                }
                Err(e) => {
                    self.stats.cycles_failed += 1;
                    error!("Cycle error: {}", e);
                    self.observer.on_cycle_error(&e);
                }
            }

            if self.config.mode == RunMode::Once {
                break;
            }

            let wait = self.next_wait(cycle_start);
            self.enter(MonitorState::Waiting);
            info!("Waiting up to {}s for the next cycle", wait.as_secs());
            if self.wait_or_stop(wait).await {
                info!("Stop signal observed during wait");
                break;
            }
        }

        self.enter(MonitorState::Stopped);
        last
    }

    /// Wait before the next cycle: interval minus time already spent
    pub fn next_wait(&self, cycle_start: Instant) -> Duration {
        let elapsed = self.clock.now().saturating_duration_since(cycle_start);
        self.config.interval.saturating_sub(elapsed)
    }

    async fn run_one_cycle(&mut self) -> Result<CycleResult> {
        self.enter(MonitorState::Authenticating);
        let doc = self.session.open().await?;

        self.enter(MonitorState::Cycling);
        let number = self.stats.cycles_completed + self.stats.cycles_failed + 1;
        let cycle = self
            .runner
            .run_cycle(number, doc.as_ref(), &self.sites, self.config.per_site_timeout)
            .await;

        if let Err(e) = doc.close().await {
            warn!("Failed to release {}: {}", self.session.describe(), e);
        }
        Ok(cycle)
    }

    /// Sleep in steps of at most `stop_poll`; true if stopped early
    async fn wait_or_stop(&self, wait: Duration) -> bool {
        let deadline = self.clock.now() + wait;
        loop {
            if self.stop.is_set() {
                return true;
            }
            let remaining = self.clock.remaining(deadline);
            if remaining.is_zero() {
                return false;
            }
            self.clock.sleep(remaining.min(self.config.stop_poll)).await;
        }
    }
}
