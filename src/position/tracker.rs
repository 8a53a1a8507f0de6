//! Background cursor sampling used when no locked position exists.
//!
//! Samples are only taken while the overlay lacks input focus; sampling while
//! focused would capture the overlay's own chrome instead of the external
//! target.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::host::{CursorPoint, HostCommands};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
const HISTORY_DEPTH: usize = 3;

/// Oldest tracked sample the queue is still allowed to inject at.
pub const FRESHNESS_BOUND: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct CursorSample {
    pub point: CursorPoint,
    pub captured_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerFailure {
    /// A sample exists but is older than the freshness bound.
    Stale,
    /// Nothing has ever been sampled.
    Empty,
}

#[derive(Clone)]
pub struct CursorTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    history: Mutex<VecDeque<CursorSample>>,
    paused: AtomicBool,
    freshness_bound: Duration,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::with_freshness_bound(FRESHNESS_BOUND)
    }

    pub fn with_freshness_bound(freshness_bound: Duration) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                history: Mutex::new(VecDeque::with_capacity(HISTORY_DEPTH)),
                paused: AtomicBool::new(false),
                freshness_bound,
            }),
        }
    }

    pub(crate) fn record(&self, point: CursorPoint) {
        let mut history = self.inner.history.lock().unwrap();
        if history.len() == HISTORY_DEPTH {
            history.pop_front();
        }
        history.push_back(CursorSample {
            point,
            captured_at: Instant::now(),
        });
    }

    pub fn latest(&self) -> Option<CursorSample> {
        self.inner.history.lock().unwrap().back().copied()
    }

    /// The most recent sample, provided it is still within the freshness
    /// bound.
    pub fn fresh_target(&self) -> Result<CursorPoint, TrackerFailure> {
        let sample = self.latest().ok_or(TrackerFailure::Empty)?;
        if sample.captured_at.elapsed() > self.inner.freshness_bound {
            return Err(TrackerFailure::Stale);
        }
        Ok(sample.point)
    }

    /// Suspended by the injection worker for the duration of each drained
    /// item.
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
    }

    pub async fn run(self, host: Arc<dyn HostCommands>, cancel: CancellationToken) {
        let mut ticker = interval(SAMPLE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.inner.paused.load(Ordering::SeqCst) {
                        continue;
                    }

                    // A failed focus query is treated as "not focused": a
                    // possibly-wrong sample beats an empty history.
                    let focused = match host.overlay_focused() {
                        Ok(focused) => focused,
                        Err(err) => {
                            debug!("focus query failed, sampling anyway: {err}");
                            false
                        }
                    };
                    if focused {
                        continue;
                    }

                    match host.cursor_position() {
                        Ok(point) => self.record(point),
                        Err(err) => debug!("cursor sample failed: {err}"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("cursor tracker shutting down");
                    break;
                }
            }
        }
    }
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sample_just_inside_freshness_bound_is_usable() {
        let tracker = CursorTracker::new();
        tracker.record(CursorPoint { x: 10, y: 20 });

        tokio::time::advance(Duration::from_millis(29_900)).await;
        assert_eq!(tracker.fresh_target(), Ok(CursorPoint { x: 10, y: 20 }));
    }

    #[tokio::test(start_paused = true)]
    async fn sample_just_past_freshness_bound_is_stale() {
        let tracker = CursorTracker::new();
        tracker.record(CursorPoint { x: 10, y: 20 });

        tokio::time::advance(Duration::from_millis(30_100)).await;
        assert_eq!(tracker.fresh_target(), Err(TrackerFailure::Stale));
    }

    #[tokio::test]
    async fn empty_history_reports_empty() {
        let tracker = CursorTracker::new();
        assert_eq!(tracker.fresh_target(), Err(TrackerFailure::Empty));
    }

    #[tokio::test]
    async fn history_keeps_only_last_three_samples() {
        let tracker = CursorTracker::new();
        for x in 0..5 {
            tracker.record(CursorPoint { x, y: 0 });
        }

        assert_eq!(tracker.latest().unwrap().point.x, 4);
        assert_eq!(tracker.inner.history.lock().unwrap().len(), 3);
        assert_eq!(tracker.inner.history.lock().unwrap()[0].point.x, 2);
    }
}
