//! Error types for the AI crate.
//!
//! - `LlmError`: backend inference failures
//! - `SchemaError`: a canonical profile failed validation
//! - `SearchError`: web search failures
//! - `ScoringError`: rubric evaluation failures
//! - `AiError`: wraps the above for callers that do not care which operation failed

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Request failed.
    RequestFailed { reason: String },
    /// The backend returned no structured output, or output that did not parse.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => write!(f, "LLM request failed: {reason}"),
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => write!(f, "rate limited, retry after {secs}s"),
                None => write!(f, "rate limited"),
            },
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from profile schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// An experience entry lacks `company` or `title`.
    IncompleteExperience { index: usize },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteExperience { index } => write!(
                f,
                "Experience entry {index} missing required fields (company, title)"
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Errors from web search operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The search provider rejected or failed the query.
    QueryFailed { query: String, reason: String },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryFailed { query, reason } => {
                write!(f, "search for '{query}' failed: {reason}")
            }
        }
    }
}

impl std::error::Error for SearchError {}

/// Errors from scoring operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    /// The scorer could not evaluate the profile.
    EvaluationFailed { reason: String },
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EvaluationFailed { reason } => write!(f, "scoring failed: {reason}"),
        }
    }
}

impl std::error::Error for ScoringError {}

/// Any failure from an AI operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    Llm(LlmError),
    Schema(SchemaError),
    Search(SearchError),
    Scoring(ScoringError),
}

impl AiError {
    /// Returns true if the error comes from malformed profile data rather
    /// than an unavailable service.
    #[must_use]
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm(e) => e.fmt(f),
            Self::Schema(e) => e.fmt(f),
            Self::Search(e) => e.fmt(f),
            Self::Scoring(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for AiError {}

impl From<LlmError> for AiError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}

impl From<SchemaError> for AiError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<SearchError> for AiError {
    fn from(e: SearchError) -> Self {
        Self::Search(e)
    }
}

impl From<ScoringError> for AiError {
    fn from(e: ScoringError) -> Self {
        Self::Scoring(e)
    }
}
