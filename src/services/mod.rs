//! Downstream collaborator seams.
//!
//! The generation and feedback backends sit behind traits so the HTTP layer
//! and the admission middleware never depend on a concrete LLM provider or
//! persistence engine. The bundled implementations are deliberate stand-ins:
//! generation echoes, feedback logging is a no-op sink.

pub mod feedback;
pub mod generator;

pub use feedback::{FeedbackSink, NoopFeedbackSink};
pub use generator::{FlipGenerator, StubFlipGenerator};
