use std::collections::HashMap;

use tokio::time::{Duration, Instant};

/// Request ids seen within the dedup window. Entries are evicted lazily on
/// each observation.
pub struct DedupCache {
    window: Duration,
    entries: HashMap<String, Instant>,
}

impl DedupCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    /// Records `id` and reports whether this is its first appearance within
    /// the window.
    pub fn observe(&mut self, id: &str, now: Instant) -> bool {
        self.entries
            .retain(|_, first_seen| now.duration_since(*first_seen) < self.window);

        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.to_string(), now);
        true
    }
}
