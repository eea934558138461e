//! Error types for the workflow crate.
//!
//! - `StepError`: a single step failed; carries an [`ErrorKind`] that decides
//!   retry eligibility and how the failure is reported on the progress stream
//! - `EngineError`: starting, resuming or finishing a run failed
//!
//! Waitpoint and journal errors live next to their components
//! ([`WaitpointError`], [`JournalError`]).

use crate::journal::JournalError;
use crate::waitpoint::WaitpointError;
use resume_review_ai::AiError;
use resume_review_core::WorkflowRunId;
use resume_review_integration::{ConnectorError, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a step failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input was rejected before any work happened.
    Validation,
    /// Extracted data did not satisfy the profile schema.
    Schema,
    /// A source, model, store or notification endpoint failed.
    External,
    /// A wait exceeded its deadline.
    Timeout,
    /// Step progress could not be recorded durably.
    Journal,
    /// Anything else, including panics caught at the run boundary.
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Schema => "schema",
            Self::External => "external",
            Self::Timeout => "timeout",
            Self::Journal => "journal",
            Self::Internal => "internal",
        }
    }

    /// Returns true if repeating the same call could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::External | Self::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step failure as seen by the orchestrator.
///
/// The message is what clients see in `error` progress events, so it is
/// kept free of internal detail beyond the underlying error's display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::External, message)
    }

    pub fn journal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Journal, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StepError {}

impl From<AiError> for StepError {
    fn from(e: AiError) -> Self {
        let kind = if e.is_schema() {
            ErrorKind::Schema
        } else {
            ErrorKind::External
        };
        Self::new(kind, e.to_string())
    }
}

impl From<ConnectorError> for StepError {
    fn from(e: ConnectorError) -> Self {
        Self::external(e.to_string())
    }
}

impl From<StoreError> for StepError {
    fn from(e: StoreError) -> Self {
        Self::external(e.to_string())
    }
}

impl From<WaitpointError> for StepError {
    fn from(e: WaitpointError) -> Self {
        let kind = match e {
            WaitpointError::Expired { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<JournalError> for StepError {
    fn from(e: JournalError) -> Self {
        Self::journal(e.to_string())
    }
}

/// Errors from the engine's run lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The journal could not be read or written.
    Journal(JournalError),
    /// No journal entries exist for the run.
    RunNotFound { run_id: WorkflowRunId },
    /// The run already produced a final result.
    RunAlreadyTerminal { run_id: WorkflowRunId },
    /// The run is still executing in this process.
    RunInProgress { run_id: WorkflowRunId },
    /// The run task ended without producing a result.
    TaskFailed { run_id: WorkflowRunId, reason: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Journal(e) => write!(f, "journal error: {e}"),
            Self::RunNotFound { run_id } => write!(f, "run not found: {run_id}"),
            Self::RunAlreadyTerminal { run_id } => {
                write!(f, "run already in terminal state: {run_id}")
            }
            Self::RunInProgress { run_id } => write!(f, "run is still in progress: {run_id}"),
            Self::TaskFailed { run_id, reason } => {
                write!(f, "run {run_id} task failed: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<JournalError> for EngineError {
    fn from(e: JournalError) -> Self {
        Self::Journal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_review_ai::SchemaError;

    #[test]
    fn schema_failures_keep_their_kind() {
        let err: StepError = AiError::from(SchemaError::IncompleteExperience { index: 0 }).into();
        assert_eq!(err.kind, ErrorKind::Schema);
        assert_eq!(
            err.message,
            "Experience entry 0 missing required fields (company, title)"
        );
    }

    #[test]
    fn connector_failures_are_external_and_retryable() {
        let err: StepError = ConnectorError::UnexpectedStatus {
            url: "https://example.com/resume.pdf".to_string(),
            status: 503,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::External);
        assert!(err.kind.is_retryable());
    }

    #[test]
    fn expired_waitpoints_become_timeouts() {
        let err: StepError = WaitpointError::Expired {
            token: "approval:c1:run_x".to_string(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Schema.is_retryable());
    }

    #[test]
    fn engine_error_display() {
        let run_id = WorkflowRunId::new();
        let err = EngineError::RunAlreadyTerminal { run_id };
        assert!(err.to_string().contains("terminal state"));
    }
}
