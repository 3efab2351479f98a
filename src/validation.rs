//! Input validation for user-submitted text fields.
//!
//! These bounds mirror the wire contract: user text is 1 to 4000 characters,
//! model identifiers are 1 to 128. Length is measured in characters, not
//! bytes, so multi-byte input is not penalized.

use crate::error::{AppError, AppResult};

/// Maximum length for user-submitted text (`text`, `input_text`,
/// `edited_text`).
pub const MAX_TEXT_CHARS: usize = 4000;

/// Maximum length for a public model identifier.
pub const MAX_MODEL_ID_CHARS: usize = 128;

/// Validate a user-submitted text field.
pub fn validate_text(value: &str, field: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }

    let chars = value.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "{field} cannot exceed {MAX_TEXT_CHARS} characters (got {chars})"
        )));
    }

    Ok(())
}

/// Validate a public model identifier.
pub fn validate_model_id(value: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::Validation("model_id cannot be empty".to_string()));
    }

    if value.chars().count() > MAX_MODEL_ID_CHARS {
        return Err(AppError::Validation(format!(
            "model_id cannot exceed {MAX_MODEL_ID_CHARS} characters"
        )));
    }

    Ok(())
}
