//! Write-input validation for quiet hours.
//!
//! [`QuietHourInput`] is the payload accepted by both create and update.
//! [`QuietHourInput::validate_for_create`] / [`QuietHourInput::validate_for_update`]
//! trim the text fields and enforce shape rules before the overlap check
//! ever runs.

use serde::Deserialize;
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: u64 = 200;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: u64 = 2000;

/// Create/update payload for a quiet hour.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuietHourInput {
    #[validate(length(min = 1, max = MAX_TITLE_LEN, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = MAX_DESCRIPTION_LEN, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// A validated, normalized quiet hour payload ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidQuietHour {
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl QuietHourInput {
    /// Validate a new window. Besides the shape rules, a window may not
    /// start before `now`.
    pub fn validate_for_create(&self, now: Timestamp) -> Result<ValidQuietHour, CoreError> {
        let valid = self.validate_for_update()?;
        if valid.start_time < now {
            return Err(CoreError::Validation(
                "Cannot schedule quiet hours in the past".into(),
            ));
        }
        Ok(valid)
    }

    /// Validate an edit. Past start times are allowed so an ongoing window
    /// can still be retitled or shortened.
    pub fn validate_for_update(&self) -> Result<ValidQuietHour, CoreError> {
        let normalized = Self {
            title: self.title.trim().to_string(),
            description: self.description.as_deref().map(|d| d.trim().to_string()),
            start_time: self.start_time,
            end_time: self.end_time,
        };

        normalized
            .validate()
            .map_err(|e| CoreError::Validation(describe(&e)))?;

        if normalized.start_time >= normalized.end_time {
            return Err(CoreError::Validation(
                "End time must be after start time".into(),
            ));
        }

        Ok(ValidQuietHour {
            title: normalized.title,
            description: normalized.description.unwrap_or_default(),
            start_time: normalized.start_time,
            end_time: normalized.end_time,
        })
    }
}

/// Flatten field errors into one stable, human-readable message.
fn describe(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
