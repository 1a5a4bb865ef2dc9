use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info};

use super::monitor::{CycleSummary, LinkHealthMonitor};
use crate::error::StoreError;

/// Drives the health monitor on a fixed cadence and on demand.
///
/// Timer cycles never overlap each other; an on-demand cycle may overlap a
/// timer cycle, in which case the last write per link wins.
pub struct LinkScheduler {
    monitor: Arc<LinkHealthMonitor>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LinkScheduler {
    pub fn new(monitor: Arc<LinkHealthMonitor>, interval: Duration) -> Self {
        Self { monitor, interval, timer: Mutex::new(None) }
    }

    /// Spawn the timer task. The first cycle runs one full interval from now.
    ///
    /// Returns false if the timer was already running.
    pub fn start(&self) -> bool {
        let mut timer = self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let monitor = self.monitor.clone();
        let period = self.interval;

        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                // A panicking cycle only takes its own task down.
                let cycle = monitor.clone();
                if let Err(e) = tokio::spawn(async move { run_cycle(&cycle, "timer").await }).await {
                    error!(error = %e, "Link health cycle aborted");
                }
            }
        }));

        info!(interval_ms = period.as_millis() as u64, "Link health scheduler started");
        true
    }

    /// Cancel the timer task. Cycles already triggered on demand keep running.
    pub fn stop(&self) {
        let handle = self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Link health scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one cycle now on the caller's task and report how it went.
    pub async fn trigger_now(&self) -> Result<CycleSummary, StoreError> {
        info!("On-demand link health cycle requested");
        self.monitor.check_all().await
    }

    /// Run one cycle now in the background; failures are only logged.
    pub fn trigger_background(&self) -> JoinHandle<()> {
        let monitor = self.monitor.clone();
        tokio::spawn(async move {
            run_cycle(&monitor, "on-demand").await;
        })
    }
}

impl Drop for LinkScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One cycle whose failure is logged and swallowed so the next tick runs normally.
async fn run_cycle(monitor: &LinkHealthMonitor, trigger: &'static str) {
    if let Err(e) = monitor.check_all().await {
        error!(trigger, error = %e, "Link health cycle failed");
    }
}
