use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_model_id() -> String {
    "gpt-5-nano".to_string()
}

/// Client-generated submission metadata correlating a generation with later
/// feedback calls. Created browser-side at flip time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionContext {
    /// Client-generated UUID correlating feedback calls.
    pub id: Uuid,
    /// UTC timestamp of submission creation.
    pub created_at: DateTime<Utc>,
    /// Original user text at flip time.
    pub input_text: String,
    /// Public model identifier selected at generation time.
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

/// Request to flip a piece of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// A social media post to flip.
    pub text: String,
    pub submission: SubmissionContext,
}

/// The rewritten post with the opposite political stance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipResponse {
    pub flipped_text: String,
    /// Features considered when flipping (tone, framing, issues, rhetoric).
    pub explanation: String,
}

/// Thumbs up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// Thumb feedback on a previous generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbFeedbackRequest {
    pub submission: SubmissionContext,
    pub vote: Vote,
    /// UTC timestamp of when feedback was given.
    pub voted_at: DateTime<Utc>,
}

/// The user's preferred version of the flipped text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFeedbackRequest {
    pub submission: SubmissionContext,
    pub edited_text: String,
    /// UTC timestamp of when the edit was submitted.
    pub edited_at: DateTime<Utc>,
}

/// Simple acknowledgement response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
