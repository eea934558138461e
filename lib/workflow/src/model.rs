//! Data passed between pipeline steps.
//!
//! Every type here is serializable because step outputs are journaled and
//! replayed on resume.

use resume_review_ai::{CanonicalProfile, JobContext, ProfileGap, RiskFlag};
use resume_review_core::CandidateId;
use resume_review_integration::SourceLocators;
use serde::{Deserialize, Serialize};

/// What a client submits to start a review.
///
/// `candidate_id` stays unvalidated here so that a missing id surfaces as a
/// failed run from the validate step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    #[serde(flatten)]
    pub sources: SourceLocators,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_context: Option<JobContext>,
}

impl CandidateInput {
    pub fn new(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: Some(candidate_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sources(mut self, sources: SourceLocators) -> Self {
        self.sources = sources;
        self
    }

    #[must_use]
    pub fn with_job_context(mut self, job_context: JobContext) -> Self {
        self.job_context = Some(job_context);
        self
    }

    /// The submitted id, or an empty string when none was given.
    #[must_use]
    pub fn candidate_label(&self) -> &str {
        self.candidate_id.as_deref().unwrap_or_default()
    }
}

/// Input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedInput {
    pub candidate_id: CandidateId,
    #[serde(flatten)]
    pub sources: SourceLocators,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_context: Option<JobContext>,
}

/// Combined plain text from every source, with a rough token count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub text: String,
    pub tokens: u32,
}

/// The enrich step's view of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProfile {
    pub canonical: CanonicalProfile,
    /// Gaps that remain after search-based filling.
    pub gaps: Vec<ProfileGap>,
    pub risk_flags: Vec<RiskFlag>,
    /// 0..=100.
    pub overall_score: u8,
    pub rationale: String,
}

/// Short marketing copy for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippets {
    pub headline: String,
    pub bio: String,
    pub highlights: Vec<String>,
}

/// A reviewer's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResult {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalResult {
    pub fn approve(reason: Option<String>) -> Self {
        Self {
            approved: true,
            reason,
        }
    }

    pub fn reject(reason: Option<String>) -> Self {
        Self {
            approved: false,
            reason,
        }
    }
}

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// What a run hands back when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub status: RunStatus,
    pub candidate_id: String,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched: Option<EnrichedProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippets: Option<Snippets>,
    /// Set when the run finished but the notification could not be sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,
}

impl WorkflowResult {
    /// A run that reached a decision.
    pub fn completed(
        candidate_id: &CandidateId,
        approval: ApprovalResult,
        enriched: EnrichedProfile,
        snippets: Snippets,
    ) -> Self {
        Self {
            status: RunStatus::Completed,
            candidate_id: candidate_id.to_string(),
            approved: approval.approved,
            reason: approval.reason,
            enriched: Some(enriched),
            snippets: Some(snippets),
            notify_error: None,
        }
    }

    /// A run that stopped on an error.
    pub fn failed(candidate_id: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            candidate_id: candidate_id.into(),
            approved: false,
            reason: None,
            enriched: None,
            snippets: None,
            notify_error: None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidate_input_reads_flat_locators() {
        let input: CandidateInput = serde_json::from_value(json!({
            "candidateId": "c1",
            "linkedInUrl": "https://linkedin.com/in/c1",
            "jobContext": {"skills": ["Rust"]}
        }))
        .expect("deserialize");

        assert_eq!(input.candidate_label(), "c1");
        assert_eq!(
            input.sources.linked_in_url.as_deref(),
            Some("https://linkedin.com/in/c1")
        );
        assert!(input.sources.upload_url.is_none());
        assert_eq!(
            input.job_context.and_then(|j| j.skills),
            Some(vec!["Rust".to_string()])
        );
    }

    #[test]
    fn missing_candidate_id_is_accepted_at_the_edge() {
        let input: CandidateInput = serde_json::from_value(json!({})).expect("deserialize");
        assert!(input.candidate_id.is_none());
        assert_eq!(input.candidate_label(), "");
    }

    #[test]
    fn failed_result_shape() {
        let json = serde_json::to_value(WorkflowResult::failed("c1")).expect("serialize");
        assert_eq!(
            json,
            json!({"status": "failed", "candidateId": "c1", "approved": false})
        );
    }

    #[test]
    fn approval_reason_is_optional_on_the_wire() {
        let approval: ApprovalResult =
            serde_json::from_value(json!({"approved": false})).expect("deserialize");
        assert_eq!(approval, ApprovalResult::reject(None));
    }
}
