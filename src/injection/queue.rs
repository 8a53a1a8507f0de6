//! Admission control and the handle to the single drain worker.
//!
//! `submit` applies, in order: dedup window, cooldown since the last started
//! injection, payload validation. Everything admitted lands on a FIFO channel
//! drained strictly one request at a time by `worker::drain_loop`. The ack
//! for a request is pushed to the surface before the request reaches the
//! channel, so the worker's terminal status can never precede it.

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::bus::SignalBus;
use crate::gateway::outbound::Outbound;
use crate::host::HostCommands;
use crate::position::{CursorTracker, LockManager};

use super::dedup::DedupCache;
use super::request::{Ack, InjectionOutcome, InjectionRequest, OutcomeReason};
use super::worker::{self, WorkerContext};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub dedup_window: Duration,
    pub cooldown: Duration,
    pub inject_timeout: Duration,
    /// Debounce after each drained item, against OS focus-change races.
    pub drain_pause: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(2),
            cooldown: Duration::from_secs(1),
            inject_timeout: Duration::from_secs(5),
            drain_pause: Duration::from_millis(200),
        }
    }
}

/// Shared between `submit` and the worker: the worker stamps `last_started`
/// when it begins an item, `submit` reads it for the cooldown check.
pub(super) struct Admission {
    pub dedup: DedupCache,
    pub last_started: Option<Instant>,
}

/// What admission decided, for callers that inspect it. The ack and any
/// immediate outcome have already been pushed to the surface, in that order,
/// by the time `submit` returns.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub ack: Ack,
    pub immediate: Option<InjectionOutcome>,
}

#[derive(Clone)]
pub struct InjectionQueue {
    tx: mpsc::UnboundedSender<InjectionRequest>,
    admission: Arc<Mutex<Admission>>,
    outbound: Outbound,
    cooldown: Duration,
    cancel: CancellationToken,
}

impl InjectionQueue {
    /// Spawns the drain worker as a child of `cancel`, so the queue stops
    /// when the overlay's lifecycle token is cancelled. Spawning goes through
    /// the Tauri runtime because `start` is called from `setup`, which runs
    /// on the main thread outside any reactor context.
    pub fn start(
        host: Arc<dyn HostCommands>,
        locks: Arc<LockManager>,
        tracker: CursorTracker,
        bus: SignalBus,
        outbound: Outbound,
        config: QueueConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let admission = Arc::new(Mutex::new(Admission {
            dedup: DedupCache::new(config.dedup_window),
            last_started: None,
        }));
        let cancel = cancel.child_token();
        let cooldown = config.cooldown;

        let ctx = WorkerContext {
            host,
            locks,
            tracker,
            bus,
            outbound: outbound.clone(),
            admission: admission.clone(),
            config,
        };
        tauri::async_runtime::spawn(worker::drain_loop(ctx, rx, cancel.clone()));

        Self {
            tx,
            admission,
            outbound,
            cooldown,
            cancel,
        }
    }

    pub fn submit(&self, request: InjectionRequest) -> SubmitOutcome {
        let now = Instant::now();

        {
            let mut admission = self.admission.lock().unwrap();
            if !admission.dedup.observe(&request.id, now) {
                debug!("duplicate request '{}' within dedup window", request.id);
                return self.reply(
                    &request.id,
                    Ack::rejected(OutcomeReason::DuplicateRequest),
                    None,
                );
            }
            if let Some(started) = admission.last_started {
                if now.duration_since(started) < self.cooldown {
                    debug!("request '{}' rejected by cooldown", request.id);
                    return self.reply(
                        &request.id,
                        Ack::rejected(OutcomeReason::CooldownActive),
                        None,
                    );
                }
            }
        }

        if request.text.trim().is_empty() {
            // Received, but fails synchronously.
            return self.reply(
                &request.id,
                Ack::accepted(),
                Some(InjectionOutcome::failure(
                    &request.id,
                    OutcomeReason::InvalidPayload,
                )),
            );
        }

        // The ack must reach the surface before the worker can possibly
        // report a terminal status, so it goes out before the send.
        let id = request.id.clone();
        let accepted = self.reply(&id, Ack::accepted(), None);
        if self.tx.send(request).is_err() {
            warn!("drain worker is gone; failing request '{id}'");
            let outcome = InjectionOutcome::failure(&id, OutcomeReason::InjectionError);
            self.outbound.injection_status(&outcome);
            return SubmitOutcome {
                ack: accepted.ack,
                immediate: Some(outcome),
            };
        }
        accepted
    }

    fn reply(&self, id: &str, ack: Ack, immediate: Option<InjectionOutcome>) -> SubmitOutcome {
        self.outbound.injection_ack(id, &ack);
        if let Some(outcome) = &immediate {
            self.outbound.injection_status(outcome);
        }
        SubmitOutcome { ack, immediate }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
