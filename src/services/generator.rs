//! Generation backend seam.
//!
//! The real backend is an LLM provider; wiring one in is outside this
//! service's scope, so the trait is the contract and [`StubFlipGenerator`]
//! is the bundled stand-in. The admission middleware exists precisely to
//! meter calls through this seam.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::error::AppResult;
use crate::models::FlipResponse;

/// Boxed future so the trait stays object-safe behind `Arc<dyn
/// FlipGenerator>`.
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = AppResult<FlipResponse>> + Send + 'a>>;

/// Produces a stance-flipped rewrite of the given text.
pub trait FlipGenerator: Send + Sync {
    fn flip<'a>(&'a self, text: &'a str) -> GenerateFuture<'a>;
}

/// Placeholder generator used until an LLM-backed implementation is wired
/// in. Returns the input unchanged with a fixed explanation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubFlipGenerator;

impl FlipGenerator for StubFlipGenerator {
    fn flip<'a>(&'a self, text: &'a str) -> GenerateFuture<'a> {
        let flipped_text = text.to_string();
        Box::pin(async move {
            debug!(text_len = flipped_text.chars().count(), "Stub generation");
            Ok(FlipResponse {
                flipped_text,
                explanation: "No generation backend is configured; the input was returned \
                              unchanged."
                    .to_string(),
            })
        })
    }
}
