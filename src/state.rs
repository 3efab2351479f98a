//! Shared application state for Axum handlers.
//!
//! The state is cheap to clone: everything is behind `Arc`. The limiter is
//! shared so that concurrent requests see one set of counters, and the
//! generator and feedback backends sit behind trait objects so tests can
//! inject stand-ins.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::limiter::{CounterStore, MemoryCounterStore, RateLimiter};
use crate::services::{FeedbackSink, FlipGenerator, NoopFeedbackSink, StubFlipGenerator};

/// Shared application state, cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Admission limiter shared across all requests
    pub limiter: Arc<RateLimiter>,
    /// Generation backend
    pub generator: Arc<dyn FlipGenerator>,
    /// Feedback recording backend
    pub feedback: Arc<dyn FeedbackSink>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create application state with the in-memory counter store and the
    /// bundled service stand-ins.
    pub fn new(config: Config) -> Self {
        Self::with_services(
            config,
            Arc::new(MemoryCounterStore::new()),
            Arc::new(StubFlipGenerator),
            Arc::new(NoopFeedbackSink),
        )
    }

    /// Create application state with injected backends. Tests use this to
    /// substitute failing stores or recording sinks.
    pub fn with_services(
        config: Config,
        store: Arc<dyn CounterStore>,
        generator: Arc<dyn FlipGenerator>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.policy(), store));

        Self {
            config: Arc::new(config),
            limiter,
            generator,
            feedback,
            started_at: Instant::now(),
        }
    }
}
