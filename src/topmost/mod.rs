//! Always-on-top supervision. Some foreground applications (and the OS
//! itself, after simulated input) knock the overlay out of the topmost band;
//! this worker notices and puts it back without fighting an injection that is
//! deliberately focusing another window.

use std::sync::Arc;

use log::{info, warn};
use tokio::time::{interval, sleep, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::bus::{Signal, SignalBus};
use crate::host::HostCommands;
use crate::utils::retry::with_retries;

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Periodic verification cadence.
    pub period: Duration,
    /// How long after an injection ends before periodic checks resume.
    pub grace: Duration,
    pub assert_attempts: u32,
    pub assert_delay: Duration,
    /// Pause between an injection ending and the fast-path reassert, so the
    /// target application finishes its own focus churn first.
    pub end_delay: Duration,
    pub fast_attempts: u32,
    pub fast_delay: Duration,
    /// Settle time between the startup assert and its read-back.
    pub startup_settle: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1500),
            grace: Duration::from_secs(3),
            assert_attempts: 3,
            assert_delay: Duration::from_millis(500),
            end_delay: Duration::from_millis(300),
            fast_attempts: 3,
            fast_delay: Duration::from_millis(200),
            startup_settle: Duration::from_millis(200),
        }
    }
}

pub struct AlwaysOnTopSupervisor {
    host: Arc<dyn HostCommands>,
    bus: SignalBus,
    config: SupervisorConfig,
}

impl AlwaysOnTopSupervisor {
    pub fn new(host: Arc<dyn HostCommands>, bus: SignalBus, config: SupervisorConfig) -> Self {
        Self { host, bus, config }
    }

    pub async fn run(self, cancel: CancellationToken) {
        self.assert_at_startup().await;

        let mut signals = self.bus.subscribe();
        let mut ticker = interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = false;
        let mut last_ended: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("always-on-top supervisor shutting down");
                    break;
                }
                signal = signals.recv() => {
                    match signal {
                        Ok(Signal::InjectionStarted { .. }) => in_flight = true,
                        Ok(Signal::InjectionEnded { .. }) => {
                            in_flight = false;
                            last_ended = Some(Instant::now());
                            sleep(self.config.end_delay).await;
                            self.reassert(self.config.fast_attempts, self.config.fast_delay)
                                .await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("topmost supervisor lagged {skipped} signals");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = ticker.tick() => {
                    if in_flight {
                        continue;
                    }
                    let in_grace = last_ended
                        .is_some_and(|t| t.elapsed() < self.config.grace);
                    if in_grace {
                        continue;
                    }
                    self.verify().await;
                }
            }
        }
    }

    async fn assert_at_startup(&self) {
        if let Err(err) = self.host.set_always_on_top(true) {
            warn!("startup always-on-top assert failed: {err:#}");
        }
        sleep(self.config.startup_settle).await;
        match self.host.always_on_top() {
            Ok(true) => info!("overlay confirmed always-on-top"),
            Ok(false) => warn!("overlay not on top after startup assert"),
            Err(err) => warn!("cannot read always-on-top state: {err:#}"),
        }
    }

    /// Periodic check: only touch window state when it has drifted.
    async fn verify(&self) {
        match self.host.always_on_top() {
            Ok(true) => {}
            Ok(false) => {
                warn!("overlay lost its topmost band; reasserting");
                self.reassert(self.config.assert_attempts, self.config.assert_delay)
                    .await;
            }
            Err(err) => {
                warn!("always-on-top query failed: {err:#}");
                self.reassert(self.config.assert_attempts, self.config.assert_delay)
                    .await;
            }
        }
    }

    async fn reassert(&self, attempts: u32, delay: Duration) {
        let result = with_retries(attempts, delay, || self.host.set_always_on_top(true)).await;
        if let Err(err) = result {
            warn!("failed to restore always-on-top after {attempts} attempts: {err:#}");
        }
    }
}
