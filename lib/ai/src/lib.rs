//! External AI-backed operations used by the resume-review workflow.
//!
//! Each operation is a trait with an input/output contract so the workflow
//! can run against fixtures or real providers:
//!
//! - **Profile extraction**: free text to [`ProfileDraft`] ([`ProfileExtractor`])
//! - **Schema check**: [`ProfileDraft`] to [`CanonicalProfile`] ([`schema_check`])
//! - **Web search**: gap-filling lookups ([`WebSearch`])
//! - **Scoring**: fit against a [`JobContext`] ([`Scorer`])

pub mod backend;
pub mod error;
pub mod profile;
pub mod schema;
pub mod scoring;
pub mod search;

pub use backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage};
pub use error::{AiError, LlmError, SchemaError, ScoringError, SearchError};
pub use profile::{
    CanonicalProfile, EducationEntry, ExperienceEntry, FixtureProfileExtractor,
    LlmProfileExtractor, ProfileDraft, ProfileExtractor, ProfileGap,
};
pub use schema::schema_check;
pub use scoring::{JobContext, RiskFlag, RubricScorer, Scorer, ScoringResult};
pub use search::{FixtureWebSearch, SearchResult, WebSearch};
