//! Wire types for the HTTP API.

pub mod api;

pub use api::{
    AckResponse, EditFeedbackRequest, FlipResponse, GenerateRequest, HealthResponse,
    SubmissionContext, ThumbFeedbackRequest, Vote,
};
