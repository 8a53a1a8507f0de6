pub mod dedup;
pub mod queue;
pub mod request;
mod worker;

pub use queue::{InjectionQueue, QueueConfig, SubmitOutcome};
pub use request::{Ack, InjectPayload, InjectionOutcome, InjectionRequest, OutcomeReason, TextKind};
