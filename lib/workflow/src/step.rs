//! Pipeline step identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named unit of work in the resume-review pipeline.
///
/// [`Step::Workflow`] is not a unit of work; it names the run itself in
/// progress events (`workflow/started`, `workflow/completed`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Workflow,
    Validate,
    Ingest,
    Extract,
    AgentEnrich,
    GenerateSnippets,
    HumanApproval,
    Persist,
    Notify,
}

impl Step {
    /// Working steps in execution order.
    pub const PIPELINE: [Step; 8] = [
        Step::Validate,
        Step::Ingest,
        Step::Extract,
        Step::AgentEnrich,
        Step::GenerateSnippets,
        Step::HumanApproval,
        Step::Persist,
        Step::Notify,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Validate => "validate",
            Self::Ingest => "ingest",
            Self::Extract => "extract",
            Self::AgentEnrich => "agent-enrich",
            Self::GenerateSnippets => "generate-snippets",
            Self::HumanApproval => "human-approval",
            Self::Persist => "persist",
            Self::Notify => "notify",
        }
    }

    /// Returns true if running the step twice with the same input has the
    /// same effect as running it once, which makes it safe to retry.
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Self::Ingest | Self::Extract | Self::AgentEnrich | Self::GenerateSnippets | Self::Persist
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
