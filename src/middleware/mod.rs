//! HTTP middleware implementing the admission-control pipeline.
//!
//! Every anonymous write request passes through this stack before it may
//! consume downstream resources (the LLM call, database writes):
//!
//! ```text
//! Request
//!    │
//!    ▼  envelope: assign X-Request-Id, seed RequestContext
//!    ▼  body_limit: 413 if declared Content-Length exceeds the cap
//!    ▼  rate_limit: resolve identity, 429 if any window is exhausted
//!    ▼  handler (only on the Allow path)
//!    │
//!    ▼  envelope: security headers + error-body normalization, always
//! Response
//! ```
//!
//! Any stage can short-circuit straight to the response; the envelope stage
//! still runs on the way out, so denials carry the same correlation ID,
//! security headers, and error body shape as everything else.

pub mod body_limit;
pub mod envelope;
pub mod identity;
pub mod rate_limit;

pub use body_limit::BodyLimitLayer;
pub use envelope::{EnvelopeLayer, REQUEST_ID_HEADER, RequestContext};
pub use identity::{ClientIdentity, UNKNOWN_IDENTITY, resolve_client_identity};
pub use rate_limit::RateLimitLayer;
