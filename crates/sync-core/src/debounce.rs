//! Per-path event suppression.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Table size above which stale entries are evicted.
const PRUNE_THRESHOLD: usize = 1024;

/// Entries older than this many windows can no longer suppress anything.
const PRUNE_AGE_WINDOWS: u32 = 4;

/// Drops events that arrive within `window` of the last accepted event for
/// the same path.
///
/// Dropped events do not move the timestamp, so a steady stream of writes is
/// accepted once per window. Owned by a single consumer; no locking.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_accepted: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether an event for `path` arriving at `now` goes through.
    pub fn accept(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(path) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        self.last_accepted.insert(path.to_path_buf(), now);
        if self.last_accepted.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }
        true
    }

    /// Evict entries too old to suppress any future event.
    pub fn prune(&mut self, now: Instant) {
        let max_age = self.window * PRUNE_AGE_WINDOWS;
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < max_age);
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}
