//! # MirrorView Backend
//!
//! HTTP backend for MirrorView, a tool that rewrites social media posts with
//! the opposite political stance. Generation is delegated to an LLM provider,
//! which makes every request expensive; the backend's main job beyond routing
//! is a request-hardening layer that meters and sanitizes traffic before it
//! reaches the handlers:
//!
//! - **Rate limiting**: per-client, per-route fixed windows; fails closed
//!   when the counter store cannot be evaluated
//! - **Body caps**: oversized requests are rejected before parsing
//! - **Security headers**: every response carries `X-Request-ID` and a
//!   restrictive header set
//! - **Error envelope**: every 4xx/5xx body is normalized to one JSON shape
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Envelope → CORS → Body Cap → Rate Limit)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (generate_response, feedback, health)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (FlipGenerator, FeedbackSink)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Limiter (RateLimiter over a CounterStore)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mirrorview_backend::{AppState, Config, build_router};
//!
//! # fn main() -> mirrorview_backend::AppResult<()> {
//! let config = Config::from_env()?;
//! let state = AppState::new(config);
//! let app = build_router(state);
//! // Serve `app` with connect info so the limiter sees peer addresses...
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult, ErrorEnvelope};
pub use routes::build_router;
pub use state::AppState;
