//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (request pipeline, outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────────┐
//! │  Error Envelope      │ ← X-Request-ID, security headers,
//! │  + Security Headers  │   normalizes every 4xx/5xx body
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │        CORS          │ ← Cross-origin headers
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │  Body Size Precheck  │ ← 413 on oversized Content-Length
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │    Rate Limiting     │ ← 429 if any window is exhausted
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │      Tracing         │ ← HTTP request/response logging
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │  Streaming Body Cap  │ ← 413 while reading the body
//! └──────────┬───────────┘
//!            ▼
//!         Handler
//! ```
//!
//! The envelope layer is outermost so that every error producer below it,
//! including framework-generated rejections, passes through normalization.
//! Rate limiting runs before the body is read so denied requests cost no
//! parsing work.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers;
use crate::middleware::{BodyLimitLayer, EnvelopeLayer, RateLimitLayer};
use crate::state::AppState;

/// Route paths. The limiter policy is keyed by these.
pub const GENERATE_PATH: &str = "/generate_response";
pub const FEEDBACK_THUMB_PATH: &str = "/feedback/thumb";
pub const FEEDBACK_EDIT_PATH: &str = "/feedback/edit";
pub const HEALTH_PATH: &str = "/health";

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_origins);

    let mut router = Router::new()
        .route(GENERATE_PATH, post(handlers::generate_response))
        .route(FEEDBACK_THUMB_PATH, post(handlers::thumb_feedback))
        .route(FEEDBACK_EDIT_PATH, post(handlers::edit_feedback))
        .route(HEALTH_PATH, get(handlers::health_check));

    // Middleware is applied bottom to top: each .layer() call wraps
    // everything added before it, so the last layer runs first.

    // 1. Streaming body cap. Catches bodies that exceed the limit while
    //    being read, including chunked uploads with no Content-Length.
    info!(
        max_bytes = config.max_request_body_bytes,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_bytes));

    // 2. Tracing
    router = router.layer(TraceLayer::new_for_http());

    // 3. Rate limiting
    if config.trust_proxy_headers {
        warn!("Trusting forwarded headers for client identity (TRUST_PROXY_HEADERS=true)");
    }
    router = router.layer(RateLimitLayer::new(
        state.limiter.clone(),
        config.trust_proxy_headers,
    ));

    // 4. Declared body size precheck. Rejects oversized Content-Length
    //    before any body bytes are read.
    router = router.layer(BodyLimitLayer::new(config.max_request_body_bytes));

    // 5. CORS
    router = router.layer(cors);

    // 6. Error envelope and security headers, outermost.
    router = router.layer(EnvelopeLayer::new(config.csp_report_only));

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// The configured origins are matched exactly. An entry of `*` allows any
/// origin, which is convenient for development but should be avoided in
/// production.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let allow_origin = if allow_any {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
