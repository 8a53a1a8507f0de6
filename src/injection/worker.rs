//! The single drain worker. This is the only place in the process that calls
//! the host injection verb, and it is strictly sequential: the OS primitive
//! simulates input against whatever window has focus, so two in-flight
//! injections would corrupt each other.

use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::{Signal, SignalBus};
use crate::gateway::outbound::Outbound;
use crate::host::HostCommands;
use crate::position::{CursorTracker, LockManager, ResolveFailure};

use super::queue::{Admission, QueueConfig};
use super::request::{InjectionOutcome, InjectionRequest, OutcomeReason};

pub(super) struct WorkerContext {
    pub host: Arc<dyn HostCommands>,
    pub locks: Arc<LockManager>,
    pub tracker: CursorTracker,
    pub bus: SignalBus,
    pub outbound: Outbound,
    pub admission: Arc<Mutex<Admission>>,
    pub config: QueueConfig,
}

pub(super) async fn drain_loop(
    ctx: WorkerContext,
    mut rx: mpsc::UnboundedReceiver<InjectionRequest>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("injection worker shutting down");
                break;
            }
            received = rx.recv() => {
                let Some(request) = received else { break };
                process_item(&ctx, request).await;
                // Debounce before the next item; OS focus changes triggered
                // by the injection need a moment to settle.
                tokio::time::sleep(ctx.config.drain_pause).await;
            }
        }
    }
}

async fn process_item(ctx: &WorkerContext, request: InjectionRequest) {
    {
        let mut admission = ctx.admission.lock().unwrap();
        admission.last_started = Some(Instant::now());
    }
    ctx.bus.publish(Signal::InjectionStarted {
        id: request.id.clone(),
    });
    ctx.tracker.pause();

    let queued_for = (chrono::Utc::now() - request.enqueued_at)
        .num_milliseconds()
        .max(0);
    info!("injecting request '{}' (queued {queued_for}ms)", request.id);

    let outcome = execute(ctx, &request).await;

    // Unconditional cleanup, regardless of which failure path was taken:
    // the overlay comes back interactive, tracking resumes, and both the
    // surface and the sibling components hear about the outcome.
    if let Err(err) = ctx.host.set_click_through(false) {
        warn!("failed to restore click-through after injection: {err:#}");
    }
    ctx.tracker.resume();
    ctx.outbound.injection_status(&outcome);
    ctx.bus.publish(Signal::InjectionEnded {
        id: request.id.clone(),
        outcome,
    });
}

async fn execute(ctx: &WorkerContext, request: &InjectionRequest) -> InjectionOutcome {
    let target = match ctx.locks.resolve(&ctx.tracker) {
        Ok(target) => target,
        Err(ResolveFailure::PositionTooOld) => {
            return InjectionOutcome::failure(&request.id, OutcomeReason::PositionTooOld);
        }
        Err(ResolveFailure::NoExternalPosition) => {
            return InjectionOutcome::failure(&request.id, OutcomeReason::NoExternalPosition);
        }
    };

    let host = ctx.host.clone();
    let text = request.text.clone();
    let call = tokio::task::spawn_blocking(move || host.inject_text_at(&text, target.x, target.y));

    match tokio::time::timeout(ctx.config.inject_timeout, call).await {
        Err(_) => {
            warn!(
                "injection '{}' timed out after {:?}",
                request.id, ctx.config.inject_timeout
            );
            InjectionOutcome::failure(&request.id, OutcomeReason::Timeout)
        }
        Ok(Err(join_err)) => {
            error!("injection worker thread failed for '{}': {join_err}", request.id);
            InjectionOutcome::failure(&request.id, OutcomeReason::InjectionError)
        }
        Ok(Ok(Err(err))) => {
            error!("host injection failed for '{}': {err:#}", request.id);
            InjectionOutcome::failure(&request.id, OutcomeReason::InjectionError)
        }
        Ok(Ok(Ok(()))) => {
            info!(
                "injected request '{}' at ({}, {})",
                request.id, target.x, target.y
            );
            InjectionOutcome::success(&request.id)
        }
    }
}
