//! Fixed-window counter store backing the rate limiter.
//!
//! # Algorithm
//!
//! Time is partitioned into fixed-size, non-overlapping windows aligned to
//! epoch boundaries of the window duration (minute windows start at :00 of
//! each minute). This is simpler than a sliding window and needs O(1) memory
//! per active key; the price is bursty edge behavior at window boundaries (up
//! to 2x the nominal rate across a boundary), which is accepted.
//!
//! # Concurrency
//!
//! One mutex guards the whole table and is held only for the O(rules)
//! check-and-commit, so increments for the same key are linearizable: no two
//! concurrent requests can both observe and act on the same pre-increment
//! count.
//!
//! # Eviction
//!
//! A counter whose window has passed is lazily reset on next touch. To keep
//! the table bounded without a background sweep, expired entries are purged
//! under the same lock once the table grows past a threshold.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use super::rules::LimitRule;

/// Table size at which a purge of expired entries is attempted.
const PURGE_THRESHOLD: usize = 10_000;

/// Outcome of an atomic check-and-commit against one route's rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// All rules passed; one unit of quota was consumed from every window.
    Allowed,
    /// A rule was violated; nothing was charged.
    Denied {
        /// Time until the violated rule's window resets. At least 1 second.
        retry_after: Duration,
    },
}

/// Error type for counter store failures. The limiter treats any store error
/// as a fail-closed denial.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Storage backend for fixed-window counters.
///
/// The in-process [`MemoryCounterStore`] is the only implementation today; a
/// shared (e.g. Redis-backed) store for multi-instance deployment plugs in
/// behind this same trait without touching the limiter.
pub trait CounterStore: Send + Sync {
    /// Atomically evaluate `rules` for `(identity, route)` at `now`.
    ///
    /// If no rule is violated, every window's counter is incremented in the
    /// same step; if any rule is violated, no counter is charged. Rules are
    /// expected in ascending window order; the first violated rule determines
    /// `retry_after`.
    fn increment_and_check(
        &self,
        identity: &str,
        route: &str,
        rules: &[LimitRule],
        now: SystemTime,
    ) -> Result<Verdict, StoreError>;
}

/// Key for one counter: identity x route x window granularity. The current
/// window start lives in the value so a key is reused across windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    identity: String,
    route: String,
    window_secs: u64,
}

/// Counter state for the window that started at `window_start`.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u64,
    window_start: u64,
}

/// Process-local fixed-window counters for single-instance deployment.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<WindowKey, WindowCounter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live counter entries. Exposed for eviction tests.
    pub fn len(&self) -> usize {
        self.counters.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment_and_check(
        &self,
        identity: &str,
        route: &str,
        rules: &[LimitRule],
        now: SystemTime,
    ) -> Result<Verdict, StoreError> {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map_err(|_| StoreError::Unavailable("system clock is before the epoch".to_string()))?
            .as_secs();

        let mut counters = self
            .counters
            .lock()
            .map_err(|_| StoreError::Unavailable("counter table lock is poisoned".to_string()))?;

        // Check pass: deny on the first violated rule, charging nothing.
        for rule in rules {
            let window_secs = rule.window_secs();
            let window_start = (now_secs / window_secs) * window_secs;
            let key = WindowKey {
                identity: identity.to_string(),
                route: route.to_string(),
                window_secs,
            };

            let current = match counters.get(&key) {
                Some(counter) if counter.window_start == window_start => counter.count,
                // Missing, or left over from a previous window.
                _ => 0,
            };

            if current >= u64::from(rule.count) {
                let reset_at = window_start + window_secs;
                let retry_after = reset_at.saturating_sub(now_secs).max(1);
                return Ok(Verdict::Denied {
                    retry_after: Duration::from_secs(retry_after),
                });
            }
        }

        // Commit pass: one logical request consumes quota from every window.
        for rule in rules {
            let window_secs = rule.window_secs();
            let window_start = (now_secs / window_secs) * window_secs;
            let key = WindowKey {
                identity: identity.to_string(),
                route: route.to_string(),
                window_secs,
            };

            counters
                .entry(key)
                .and_modify(|counter| {
                    if counter.window_start == window_start {
                        counter.count += 1;
                    } else {
                        // Lazy reset of an expired window.
                        *counter = WindowCounter {
                            count: 1,
                            window_start,
                        };
                    }
                })
                .or_insert(WindowCounter {
                    count: 1,
                    window_start,
                });
        }

        if counters.len() >= PURGE_THRESHOLD {
            counters.retain(|key, counter| counter.window_start + key.window_secs > now_secs);
        }

        Ok(Verdict::Allowed)
    }
}
