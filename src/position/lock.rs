//! Single-slot position lock: a user-initiated capture of "where to inject",
//! anchored relatively to the foreground window so it survives that window
//! moving. Locking replaces any prior lock; the slot is swapped atomically as
//! an immutable snapshot, so the drain worker can keep reading mid-lock.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::host::{CursorPoint, HostCommands, WindowInfo};

use super::store::LockStore;
use super::tracker::{CursorTracker, TrackerFailure};

/// Offset of the locked point from the window origin at lock time. Only
/// meaningful paired with the application it was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeOffset {
    pub dx: i32,
    pub dy: i32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedPosition {
    pub absolute: CursorPoint,
    pub application: String,
    pub window: WindowInfo,
    pub relative: RelativeOffset,
    pub locked_at: DateTime<Utc>,
}

/// What to do when the foreground application at injection time is not the
/// one the lock was captured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchPolicy {
    /// Inject at the originally recorded absolute coordinate. A drifted
    /// coordinate is preferable to no injection.
    #[default]
    UseStaleAbsolute,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFailure {
    PositionTooOld,
    NoExternalPosition,
}

pub struct LockManager {
    host: Arc<dyn HostCommands>,
    current: Mutex<Option<Arc<LockedPosition>>>,
    store: Option<LockStore>,
    policy: MismatchPolicy,
}

impl LockManager {
    pub fn new(
        host: Arc<dyn HostCommands>,
        store: Option<LockStore>,
        policy: MismatchPolicy,
    ) -> Self {
        Self {
            host,
            current: Mutex::new(None),
            store,
            policy,
        }
    }

    /// Capture the current cursor position together with the foreground
    /// window geometry. Fails if either read fails; replaces any prior lock.
    pub fn lock(&self) -> Result<Arc<LockedPosition>> {
        let cursor = self
            .host
            .cursor_position()
            .context("reading cursor for lock")?;
        let window = self
            .host
            .foreground_window()
            .context("reading foreground window for lock")?;

        let now = Utc::now();
        let locked = Arc::new(LockedPosition {
            absolute: cursor,
            application: window.application_name.clone(),
            relative: RelativeOffset {
                dx: cursor.x - window.x,
                dy: cursor.y - window.y,
                captured_at: now,
            },
            window,
            locked_at: now,
        });

        info!(
            "locked position ({}, {}) in '{}' (relative {}, {})",
            cursor.x, cursor.y, locked.application, locked.relative.dx, locked.relative.dy
        );

        if let Some(store) = &self.store {
            if let Err(err) = store.save(&locked.application, &locked) {
                warn!("failed to persist lock for '{}': {err:#}", locked.application);
            }
        }

        *self.current.lock().unwrap() = Some(locked.clone());
        Ok(locked)
    }

    /// Clears the current lock. Idempotent; persisted locks are untouched.
    pub fn unlock(&self) {
        let previous = self.current.lock().unwrap().take();
        if previous.is_some() {
            info!("position lock cleared");
        }
    }

    pub fn is_locked(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    pub fn current(&self) -> Option<Arc<LockedPosition>> {
        self.current.lock().unwrap().clone()
    }

    /// Re-install a previously persisted lock for `application`, if any.
    pub fn restore(&self, application: &str) -> Result<Option<Arc<LockedPosition>>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.load(application)? {
            Some(locked) => {
                let locked = Arc::new(locked);
                info!("restored persisted lock for '{application}'");
                *self.current.lock().unwrap() = Some(locked.clone());
                Ok(Some(locked))
            }
            None => Ok(None),
        }
    }

    /// Derive the injection target. With a lock present the target follows
    /// the window it was anchored to; without one, the freshest tracked
    /// cursor sample stands in.
    pub fn resolve(&self, tracker: &CursorTracker) -> Result<CursorPoint, ResolveFailure> {
        if let Some(lock) = self.current() {
            return self.resolve_locked(&lock);
        }

        tracker.fresh_target().map_err(|failure| match failure {
            TrackerFailure::Stale => ResolveFailure::PositionTooOld,
            TrackerFailure::Empty => ResolveFailure::NoExternalPosition,
        })
    }

    fn resolve_locked(&self, lock: &LockedPosition) -> Result<CursorPoint, ResolveFailure> {
        match self.host.foreground_window() {
            Ok(window) if window.application_name == lock.application => {
                let origin = window.origin();
                Ok(CursorPoint {
                    x: origin.x + lock.relative.dx,
                    y: origin.y + lock.relative.dy,
                })
            }
            Ok(window) => {
                warn!(
                    "foreground application '{}' does not match lock '{}'",
                    window.application_name, lock.application
                );
                match self.policy {
                    MismatchPolicy::UseStaleAbsolute => Ok(lock.absolute),
                    // No reason code exists for a mismatch; the lock is
                    // unusable and nothing external stands in for it.
                    MismatchPolicy::Fail => Err(ResolveFailure::NoExternalPosition),
                }
            }
            Err(err) => {
                // Losing the geometry read should not lose the lock.
                warn!("foreground window re-fetch failed, using recorded absolute: {err:#}");
                Ok(lock.absolute)
            }
        }
    }
}
