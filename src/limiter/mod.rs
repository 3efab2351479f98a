//! Per-route, per-identity rate limiting over fixed time windows.
//!
//! The limiter owns a route policy (ordered [`LimitRule`] sets) and consults
//! an injected [`CounterStore`] for the actual counters. The store is the only
//! shared mutable state in the admission path; swapping it for a distributed
//! backend does not touch the limiter's logic.
//!
//! # Fail-closed policy
//!
//! If the store cannot be evaluated, [`RateLimiter::check`] returns `Deny`
//! with a generic retry hint rather than letting the request through.
//! Availability of the limiter is a precondition for accepting writes; it
//! protects the downstream LLM spend from unmetered exposure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::error;

pub mod rules;
pub mod store;

pub use rules::{LimitRule, RuleParseError, parse_rules};
pub use store::{CounterStore, MemoryCounterStore, StoreError, Verdict};

/// Retry hint returned on fail-closed denials, where no window boundary is
/// known.
const FAIL_CLOSED_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { retry_after: Duration },
}

/// Evaluates configured route limits against a counter store.
pub struct RateLimiter {
    /// Route path -> rules in ascending window order.
    policy: HashMap<String, Vec<LimitRule>>,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    /// Build a limiter from a route policy. Rule sets are normalized to
    /// ascending window order so the tightest window is evaluated first.
    pub fn new(policy: HashMap<String, Vec<LimitRule>>, store: Arc<dyn CounterStore>) -> Self {
        let policy = policy
            .into_iter()
            .map(|(route, mut rules)| {
                rules.sort_by_key(LimitRule::window_secs);
                (route, rules)
            })
            .collect();
        Self { policy, store }
    }

    /// Whether `route` has any configured limits.
    pub fn limits_route(&self, route: &str) -> bool {
        self.policy.contains_key(route)
    }

    /// Check admission for one request, consuming quota when allowed.
    pub fn check(&self, identity: &str, route: &str) -> Decision {
        self.check_at(identity, route, SystemTime::now())
    }

    /// [`check`](Self::check) with an explicit clock, for deterministic tests.
    pub fn check_at(&self, identity: &str, route: &str, now: SystemTime) -> Decision {
        let Some(rules) = self.policy.get(route) else {
            return Decision::Allow;
        };

        match self.store.increment_and_check(identity, route, rules, now) {
            Ok(Verdict::Allowed) => Decision::Allow,
            Ok(Verdict::Denied { retry_after }) => Decision::Deny { retry_after },
            Err(e) => {
                // Fail closed: a limiter that cannot count must not admit.
                error!(error = %e, route, "Counter store unavailable, denying request");
                crate::metrics::record_store_fault(route);
                Decision::Deny {
                    retry_after: FAIL_CLOSED_RETRY_AFTER,
                }
            }
        }
    }
}
