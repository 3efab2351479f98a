//! HTTP request handlers.
//!
//! Handlers validate input and delegate to the service seams in
//! [`crate::services`]. Admission control (rate limiting, body caps) has
//! already run by the time a handler executes, and the error envelope
//! middleware normalizes anything a handler returns through `AppError`.

pub mod feedback;
pub mod generate;
pub mod health;

pub use feedback::{edit_feedback, thumb_feedback};
pub use generate::generate_response;
pub use health::health_check;
