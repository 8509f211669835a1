//! At most one external lookup per address per window.
//!
//! Each address remembers the time of its last lookup attempt, successful or
//! not. An attempt inside the window is refused. Entries older than the
//! window carry no information and may be pruned at any time.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(3_000);

#[derive(Clone)]
pub struct CooldownGate {
    // address -> last attempt, epoch ms
    last_attempt: Arc<DashMap<String, u64>>,
    window_ms: u64,
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            last_attempt: Arc::new(DashMap::new()),
            window_ms: window.as_millis() as u64,
        }
    }

    /// Returns true and records `now_ms` if the address may be looked up.
    ///
    /// The check and the record happen under the shard lock for `address`,
    /// so concurrent callers inside one window see exactly one `true`.
    pub fn try_acquire(&self, address: &str, now_ms: u64) -> bool {
        match self.last_attempt.entry(address.to_string()) {
            Entry::Occupied(mut entry) => {
                if now_ms.saturating_sub(*entry.get()) < self.window_ms {
                    return false;
                }
                entry.insert(now_ms);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now_ms);
                true
            }
        }
    }

    /// Drop entries whose window has elapsed. Returns how many were removed.
    pub fn prune(&self, now_ms: u64) -> usize {
        let before = self.last_attempt.len();
        self.last_attempt
            .retain(|_, last| now_ms.saturating_sub(*last) < self.window_ms);
        before.saturating_sub(self.last_attempt.len())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn len(&self) -> usize {
        self.last_attempt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_attempt.is_empty()
    }
}
