//! Feedback endpoints.
//!
//! `POST /feedback/thumb` - thumbs up/down on a previous generation.
//! `POST /feedback/edit` - the user's preferred rewrite of the output.

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::AppResult;
use crate::models::{AckResponse, EditFeedbackRequest, ThumbFeedbackRequest};
use crate::state::AppState;
use crate::validation::{validate_model_id, validate_text};

/// Record a thumbs up/down vote.
#[instrument(skip(state, request), fields(submission_id = %request.submission.id))]
pub async fn thumb_feedback(
    State(state): State<AppState>,
    Json(request): Json<ThumbFeedbackRequest>,
) -> AppResult<Json<AckResponse>> {
    validate_text(&request.submission.input_text, "submission.input_text")?;
    validate_model_id(&request.submission.model_id)?;

    state.feedback.record_thumb(&request).await?;
    Ok(Json(AckResponse { ok: true }))
}

/// Record an edited version of the flipped text.
#[instrument(skip(state, request), fields(submission_id = %request.submission.id))]
pub async fn edit_feedback(
    State(state): State<AppState>,
    Json(request): Json<EditFeedbackRequest>,
) -> AppResult<Json<AckResponse>> {
    validate_text(&request.edited_text, "edited_text")?;
    validate_text(&request.submission.input_text, "submission.input_text")?;
    validate_model_id(&request.submission.model_id)?;

    state.feedback.record_edit(&request).await?;
    Ok(Json(AckResponse { ok: true }))
}
