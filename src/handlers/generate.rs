//! Text flipping endpoint.
//!
//! `POST /generate_response` - rewrite a post with the opposite stance.

use axum::Json;
use axum::extract::State;
use tracing::{info, instrument};

use crate::error::AppResult;
use crate::models::{FlipResponse, GenerateRequest};
use crate::state::AppState;
use crate::validation::{validate_model_id, validate_text};

/// Flip the stance of a piece of text.
///
/// Validates the request, then delegates to the configured generator. The
/// user's text is never logged, only its length.
#[instrument(skip(state, request), fields(submission_id = %request.submission.id))]
pub async fn generate_response(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Json<FlipResponse>> {
    validate_text(&request.text, "text")?;
    validate_text(&request.submission.input_text, "submission.input_text")?;
    validate_model_id(&request.submission.model_id)?;

    info!(
        text_len = request.text.chars().count(),
        model_id = %request.submission.model_id,
        "Generating flipped response"
    );

    let flip = state.generator.flip(&request.text).await?;
    Ok(Json(flip))
}
