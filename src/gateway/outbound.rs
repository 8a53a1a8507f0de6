//! Outbound half of the gateway: every message the host pushes to the
//! embedded surface goes through the kind allow-list here, so the host can
//! never emit something the content side wasn't contracted to expect.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::warn;
use serde_json::{json, Value};
use tauri::{AppHandle, Emitter};

use crate::injection::{Ack, InjectionOutcome};

pub const OUTBOUND_KINDS: &[&str] = &["injection_ack", "injection_status", "lock_status"];

pub trait ContentSink: Send + Sync {
    fn emit(&self, kind: &str, payload: Value) -> Result<()>;
}

/// Emits gateway messages as Tauri events; the shell page relays them into
/// the embedded surface via postMessage.
pub struct EventSink {
    app: AppHandle,
}

impl EventSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ContentSink for EventSink {
    fn emit(&self, kind: &str, payload: Value) -> Result<()> {
        self.app
            .emit(kind, payload)
            .with_context(|| format!("emitting '{kind}' to the surface"))
    }
}

#[derive(Clone)]
pub struct Outbound {
    sink: Arc<dyn ContentSink>,
}

impl Outbound {
    pub fn new(sink: Arc<dyn ContentSink>) -> Self {
        Self { sink }
    }

    pub fn send(&self, kind: &str, payload: Value) -> Result<()> {
        if !OUTBOUND_KINDS.contains(&kind) {
            bail!("refusing to send message kind '{kind}' outside the outbound allow-list");
        }
        self.sink.emit(kind, payload)
    }

    pub fn injection_ack(&self, id: &str, ack: &Ack) {
        self.send_logged(
            "injection_ack",
            json!({
                "id": id,
                "accepted": ack.accepted,
                "reason": ack.reason,
            }),
        );
    }

    pub fn injection_status(&self, outcome: &InjectionOutcome) {
        match serde_json::to_value(outcome) {
            Ok(payload) => self.send_logged("injection_status", payload),
            Err(err) => warn!("failed to serialize injection status: {err}"),
        }
    }

    pub fn lock_status(&self, locked: bool) {
        self.send_logged("lock_status", json!({ "locked": locked }));
    }

    fn send_logged(&self, kind: &str, payload: Value) {
        if let Err(err) = self.send(kind, payload) {
            warn!("failed to push '{kind}' to the surface: {err:#}");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct CollectingSink {
        pub emitted: Mutex<Vec<(String, Value)>>,
    }

    impl CollectingSink {
        pub fn by_kind(&self, kind: &str) -> Vec<Value> {
            self.emitted
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| k == kind)
                .map(|(_, payload)| payload.clone())
                .collect()
        }

        pub fn is_empty(&self) -> bool {
            self.emitted.lock().unwrap().is_empty()
        }
    }

    impl ContentSink for CollectingSink {
        fn emit(&self, kind: &str, payload: Value) -> Result<()> {
            self.emitted
                .lock()
                .unwrap()
                .push((kind.to_string(), payload));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CollectingSink;
    use super::*;

    #[test]
    fn unlisted_kind_is_refused() {
        let sink = Arc::new(CollectingSink::default());
        let outbound = Outbound::new(sink.clone());

        assert!(outbound.send("debug_dump", json!({})).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn listed_kind_reaches_the_sink() {
        let sink = Arc::new(CollectingSink::default());
        let outbound = Outbound::new(sink.clone());

        outbound.lock_status(true);
        let pushed = sink.by_kind("lock_status");
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0]["locked"], true);
    }
}
