//! Raw source collection.

use crate::error::StepError;
use crate::progress::IngestSummary;
use resume_review_integration::{RawSources, SourceFetcher, SourceLocators};
use tracing::debug;

/// Fetches raw material for every locator.
///
/// # Errors
///
/// Returns an external error if any present source cannot be fetched.
pub async fn ingest(
    fetcher: &dyn SourceFetcher,
    locators: &SourceLocators,
) -> Result<RawSources, StepError> {
    let raw = fetcher.fetch(locators).await?;
    debug!(
        resume = raw.resume_text.is_some(),
        linked_in = raw.linked_in_html.is_some(),
        github = raw.github_readme.is_some(),
        "sources fetched"
    );
    Ok(raw)
}

/// Which channels produced non-empty material.
#[must_use]
pub fn summarize(raw: &RawSources) -> IngestSummary {
    let present = |text: &Option<String>| text.as_deref().is_some_and(|t| !t.is_empty());
    IngestSummary {
        has_resume: present(&raw.resume_text),
        has_linked_in: present(&raw.linked_in_html),
        has_git_hub: present(&raw.github_readme),
    }
}
