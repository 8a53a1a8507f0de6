//! Secure Message Gateway: the single entry point for untrusted
//! cross-boundary messages from the embedded surface.
//!
//! A message is dispatched only if its origin and its declared kind both pass
//! fixed allow-lists. Rejections are silent to the sender — from the
//! surface's perspective a rejected message is indistinguishable from one
//! that was never sent — but logged here.

pub mod commands;
pub mod outbound;

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::host::{HostCommands, RecordingIndicator};
use crate::injection::{InjectPayload, InjectionQueue, InjectionRequest};
use crate::position::LockManager;

pub use outbound::{ContentSink, EventSink, Outbound};

/// Message kinds the gateway will dispatch. Anything else is dropped at the
/// gate even from an allowed origin.
pub const INBOUND_KINDS: &[&str] = &[
    "ready",
    "inject",
    "lock",
    "unlock",
    "update_lock",
    "request_status",
    "recording_started",
    "recording_paused",
    "recording_finished",
];

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    Accepted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    OriginNotAllowed,
    UnknownKind,
}

pub struct MessageGateway {
    allowed_origins: HashSet<String>,
    queue: InjectionQueue,
    locks: Arc<LockManager>,
    host: Arc<dyn HostCommands>,
    outbound: Outbound,
}

impl MessageGateway {
    pub fn new(
        allowed_origins: impl IntoIterator<Item = String>,
        queue: InjectionQueue,
        locks: Arc<LockManager>,
        host: Arc<dyn HostCommands>,
        outbound: Outbound,
    ) -> Self {
        Self {
            allowed_origins: allowed_origins.into_iter().collect(),
            queue,
            locks,
            host,
            outbound,
        }
    }

    pub fn receive(&self, origin: &str, message: InboundMessage) -> Reception {
        if !self.allowed_origins.contains(origin) {
            warn!(
                "dropping message kind '{}' from disallowed origin '{origin}'",
                message.kind
            );
            return Reception::Rejected(RejectReason::OriginNotAllowed);
        }
        if !INBOUND_KINDS.contains(&message.kind.as_str()) {
            warn!(
                "dropping unknown message kind '{}' from '{origin}'",
                message.kind
            );
            return Reception::Rejected(RejectReason::UnknownKind);
        }

        self.dispatch(message);
        Reception::Accepted
    }

    fn dispatch(&self, message: InboundMessage) {
        match message.kind.as_str() {
            "ready" | "request_status" => {
                self.outbound.lock_status(self.locks.is_locked());
            }
            "inject" => self.handle_inject(message.payload),
            "lock" | "update_lock" => {
                match self.locks.lock() {
                    Ok(_) => self.outbound.lock_status(true),
                    Err(err) => {
                        warn!("lock capture failed: {err:#}");
                        self.outbound.lock_status(self.locks.is_locked());
                    }
                }
            }
            "unlock" => {
                self.locks.unlock();
                self.outbound.lock_status(false);
            }
            "recording_started" => self.forward_indicator(RecordingIndicator::Started),
            "recording_paused" => self.forward_indicator(RecordingIndicator::Paused),
            "recording_finished" => self.forward_indicator(RecordingIndicator::Finished),
            // In the allow-list but not handled yet: log and drop, so newer
            // surfaces can probe without breaking older hosts.
            other => info!("message kind '{other}' is allowed but unhandled; dropping"),
        }
    }

    fn handle_inject(&self, payload: Value) {
        let payload: InjectPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(err) => {
                // Malformed payloads follow the invalid-payload path so the
                // surface still gets an ack and a terminal status.
                debug!("malformed inject payload: {err}");
                InjectPayload::default()
            }
        };

        // The queue pushes the ack (and any immediate status) itself, ahead
        // of handing the request to the worker.
        let request = InjectionRequest::from_payload(payload);
        self.queue.submit(request);
    }

    fn forward_indicator(&self, state: RecordingIndicator) {
        // Best-effort; the surface never hears about indicator failures.
        if let Err(err) = self.host.set_recording_indicator(state) {
            debug!("recording indicator update failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::outbound::testing::CollectingSink;
    use super::*;
    use crate::bus::SignalBus;
    use crate::host::testing::MockHost;
    use crate::injection::QueueConfig;
    use crate::position::{CursorTracker, MismatchPolicy};
    use serde_json::json;

    struct Rig {
        host: Arc<MockHost>,
        sink: Arc<CollectingSink>,
        gateway: MessageGateway,
        queue: InjectionQueue,
    }

    fn rig() -> Rig {
        let host = Arc::new(MockHost::default());
        let sink = Arc::new(CollectingSink::default());
        let outbound = Outbound::new(sink.clone());
        let locks = Arc::new(LockManager::new(
            host.clone(),
            None,
            MismatchPolicy::UseStaleAbsolute,
        ));
        let queue = InjectionQueue::start(
            host.clone(),
            locks.clone(),
            CursorTracker::new(),
            SignalBus::new(),
            outbound.clone(),
            QueueConfig::default(),
            tokio_util::sync::CancellationToken::new(),
        );
        let gateway = MessageGateway::new(
            ["https://app.scrivo.dev".to_string()],
            queue.clone(),
            locks,
            host.clone(),
            outbound,
        );
        Rig {
            host,
            sink,
            gateway,
            queue,
        }
    }

    fn message(kind: &str, payload: Value) -> InboundMessage {
        InboundMessage {
            kind: kind.to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn disallowed_origin_is_dropped_silently() {
        let rig = rig();
        let reception = rig.gateway.receive(
            "https://evil.example",
            message("inject", json!({"text": "payload"})),
        );

        assert_eq!(reception, Reception::Rejected(RejectReason::OriginNotAllowed));
        assert!(rig.sink.is_empty());
        assert_eq!(rig.host.injection_count(), 0);
        rig.queue.shutdown();
    }

    #[tokio::test]
    async fn unknown_kind_from_allowed_origin_is_dropped_silently() {
        let rig = rig();
        let reception = rig
            .gateway
            .receive("https://app.scrivo.dev", message("foo", json!({})));

        assert_eq!(reception, Reception::Rejected(RejectReason::UnknownKind));
        assert!(rig.sink.is_empty());
        rig.queue.shutdown();
    }

    #[tokio::test]
    async fn inject_is_acked_before_any_status() {
        let rig = rig();
        rig.gateway.receive(
            "https://app.scrivo.dev",
            message("inject", json!({"id": "a", "text": ""})),
        );

        let emitted = rig.sink.emitted.lock().unwrap();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].0, "injection_ack");
        assert_eq!(emitted[0].1["accepted"], true);
        assert_eq!(emitted[1].0, "injection_status");
        assert_eq!(emitted[1].1["reason"], "INVALID_PAYLOAD");
        drop(emitted);
        rig.queue.shutdown();
    }

    #[tokio::test]
    async fn ready_pushes_lock_status() {
        let rig = rig();
        rig.gateway
            .receive("https://app.scrivo.dev", message("ready", Value::Null));

        let statuses = rig.sink.by_kind("lock_status");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0]["locked"], false);
        rig.queue.shutdown();
    }

    #[tokio::test]
    async fn lock_message_captures_and_reports() {
        let rig = rig();
        rig.host.set_cursor(500, 300);
        rig.host.set_window("ris.exe", 100, 100);

        rig.gateway
            .receive("https://app.scrivo.dev", message("lock", Value::Null));
        rig.gateway
            .receive("https://app.scrivo.dev", message("unlock", Value::Null));

        let statuses = rig.sink.by_kind("lock_status");
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0]["locked"], true);
        assert_eq!(statuses[1]["locked"], false);
        rig.queue.shutdown();
    }

    #[tokio::test]
    async fn recording_kinds_forward_to_the_indicator() {
        let rig = rig();
        rig.gateway.receive(
            "https://app.scrivo.dev",
            message("recording_started", Value::Null),
        );
        rig.gateway.receive(
            "https://app.scrivo.dev",
            message("recording_finished", Value::Null),
        );

        let calls = rig.host.indicator_calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![RecordingIndicator::Started, RecordingIndicator::Finished]
        );
        // Indicator traffic never reaches the surface.
        drop(calls);
        assert!(rig.sink.is_empty());
        rig.queue.shutdown();
    }

    #[tokio::test]
    async fn malformed_inject_payload_still_gets_terminal_status() {
        let rig = rig();
        rig.gateway.receive(
            "https://app.scrivo.dev",
            message("inject", json!({"text": 42})),
        );

        let statuses = rig.sink.by_kind("injection_status");
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0]["reason"], "INVALID_PAYLOAD");
        rig.queue.shutdown();
    }
}
