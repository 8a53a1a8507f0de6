//! Internal signal bus connecting the injection queue to the components that
//! must stand down while an injection is in flight.

use tokio::sync::broadcast;

use crate::injection::InjectionOutcome;

const BUS_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub enum Signal {
    InjectionStarted { id: String },
    InjectionEnded { id: String, outcome: InjectionOutcome },
}

#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Delivery is best-effort: a signal with no subscribers is dropped.
    pub fn publish(&self, signal: Signal) {
        let _ = self.tx.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
