pub mod commands;
pub mod lock;
pub mod store;
pub mod tracker;

pub use lock::{LockManager, LockedPosition, MismatchPolicy, RelativeOffset, ResolveFailure};
pub use store::LockStore;
pub use tracker::CursorTracker;
