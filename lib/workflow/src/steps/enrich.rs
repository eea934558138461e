//! Agent enrichment: extract, check, fill gaps, score.

use crate::error::StepError;
use crate::model::{EnrichedProfile, ExtractedData};
use crate::progress::{EnrichSummary, Progress, ProgressEmitter, ProgressEvent, ToolCall};
use crate::step::Step;
use resume_review_ai::{
    AiError, CanonicalProfile, JobContext, ProfileExtractor, ProfileGap, Scorer, SearchResult,
    WebSearch, schema_check,
};
use tracing::{debug, info};

/// The tools the enrich step calls out to.
#[derive(Clone, Copy)]
pub struct EnrichTools<'a> {
    pub extractor: &'a dyn ProfileExtractor,
    pub search: &'a dyn WebSearch,
    pub scorer: &'a dyn Scorer,
}

/// Accumulates tool calls and reports the whole list after each one.
struct ToolTrail<'a> {
    emitter: &'a ProgressEmitter,
    calls: Vec<ToolCall>,
}

impl<'a> ToolTrail<'a> {
    fn new(emitter: &'a ProgressEmitter) -> Self {
        Self {
            emitter,
            calls: Vec::new(),
        }
    }

    async fn record(&mut self, name: &str, description: impl Into<String>) {
        self.calls.push(ToolCall::now(name, description));
        self.emitter
            .emit(ProgressEvent::new(
                Step::AgentEnrich,
                Progress::ToolCall {
                    tool_calls: self.calls.clone(),
                },
            ))
            .await;
    }
}

/// Builds a profile from extracted text and scores it.
///
/// # Errors
///
/// Returns a schema error if the extracted draft is incomplete, or an
/// external error if a tool fails.
pub async fn enrich(
    tools: EnrichTools<'_>,
    extracted: &ExtractedData,
    job: Option<&JobContext>,
    emitter: &ProgressEmitter,
) -> Result<EnrichedProfile, StepError> {
    info!(tokens = extracted.tokens, "enriching candidate profile");
    let mut trail = ToolTrail::new(emitter);

    trail
        .record(
            "extractCanonicalProfile",
            "Extract structured profile from resume text using LLM",
        )
        .await;
    let draft = tools.extractor.extract(&extracted.text).await?;

    trail
        .record("schemaCheck", "Validate profile matches expected schema")
        .await;
    let canonical = schema_check(draft).map_err(AiError::from)?;

    let initial_gaps = canonical.gaps();
    debug!(gaps = ?initial_gaps, "profile gaps identified");

    let mut filled = canonical;
    if !initial_gaps.is_empty() {
        let query = gap_query(&initial_gaps, &filled);
        trail
            .record(
                "webSearch",
                format!(
                    "Search for missing information: {}",
                    join_gaps(&initial_gaps, ", ")
                ),
            )
            .await;
        let results = tools.search.search(&query).await?;
        fill_from_search(&mut filled, &results);
        debug!(remaining = filled.gaps().len(), "gaps after search");
    }

    trail
        .record(
            "scoreWithRubric",
            "Evaluate candidate against job requirements",
        )
        .await;
    let scoring = tools.scorer.score(&filled, job).await?;

    Ok(EnrichedProfile {
        gaps: filled.gaps(),
        canonical: filled,
        risk_flags: scoring.risk_flags,
        overall_score: scoring.score,
        rationale: scoring.rationale,
    })
}

/// Search query for filling the given gaps.
#[must_use]
pub fn gap_query(gaps: &[ProfileGap], profile: &CanonicalProfile) -> String {
    let name = profile
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("candidate");
    format!("{name} {} professional profile", join_gaps(gaps, " "))
}

fn join_gaps(gaps: &[ProfileGap], separator: &str) -> String {
    gaps.iter()
        .map(ProfileGap::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Adds result URLs the profile does not already list.
pub fn fill_from_search(profile: &mut CanonicalProfile, results: &[SearchResult]) {
    profile.merge_urls(results.iter().map(|r| r.url.clone()));
}

#[must_use]
pub fn summarize(enriched: &EnrichedProfile) -> EnrichSummary {
    EnrichSummary {
        score: enriched.overall_score,
        gaps: enriched.gaps.len(),
        risk_flags: enriched.risk_flags.len(),
    }
}
