//! Input validation.

use crate::error::StepError;
use crate::model::{CandidateInput, ValidatedInput};
use resume_review_core::CandidateId;

/// Message for a review submitted without any source locator.
pub const NO_SOURCES_MESSAGE: &str =
    "At least one data source is required (uploadUrl, linkedInUrl, or githubUrl)";

/// Checks the submitted input.
///
/// A candidate id is always required. Source locators are only required
/// when sources are fetched for real; fixture sources ignore them.
///
/// # Errors
///
/// Returns a validation error describing the first problem found.
pub fn validate(input: &CandidateInput, require_sources: bool) -> Result<ValidatedInput, StepError> {
    let candidate_id = CandidateId::new(input.candidate_id.clone().unwrap_or_default())
        .map_err(|e| StepError::validation(e.to_string()))?;

    if require_sources && !input.sources.any() {
        return Err(StepError::validation(NO_SOURCES_MESSAGE));
    }

    Ok(ValidatedInput {
        candidate_id,
        sources: input.sources.clone(),
        job_context: input.job_context.clone(),
    })
}
