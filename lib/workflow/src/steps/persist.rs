//! Storage of reviewed profiles.

use crate::error::StepError;
use crate::model::{EnrichedProfile, Snippets};
use chrono::Utc;
use resume_review_core::CandidateId;
use resume_review_integration::ProfileStore;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The stored shape of a reviewed candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub enriched: EnrichedProfile,
    pub snippets: Snippets,
    pub approved: bool,
    pub candidate_id: String,
    /// Epoch milliseconds.
    pub ts: i64,
}

/// Where a record was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReceipt {
    pub key: String,
}

/// Store key for a candidate's record.
#[must_use]
pub fn record_key(candidate_id: &CandidateId) -> String {
    format!("candidate:{candidate_id}")
}

/// Upserts the record for an approved candidate.
///
/// # Errors
///
/// Returns an external error if the store rejects the write.
pub async fn persist(
    store: &dyn ProfileStore,
    candidate_id: &CandidateId,
    enriched: &EnrichedProfile,
    snippets: &Snippets,
) -> Result<PersistReceipt, StepError> {
    let key = record_key(candidate_id);
    let record = ReviewRecord {
        enriched: enriched.clone(),
        snippets: snippets.clone(),
        approved: true,
        candidate_id: candidate_id.to_string(),
        ts: Utc::now().timestamp_millis(),
    };
    let value = serde_json::to_value(&record)
        .map_err(|e| StepError::internal(format!("failed to encode review record: {e}")))?;

    store.upsert(&key, value).await?;
    info!(%key, "review record stored");
    Ok(PersistReceipt { key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_review_ai::FixtureProfileExtractor;
    use resume_review_integration::InMemoryProfileStore;

    #[tokio::test]
    async fn upsert_is_keyed_by_candidate() {
        let store = InMemoryProfileStore::new();
        let candidate_id = CandidateId::new("c1").expect("id");
        let enriched = EnrichedProfile {
            canonical: FixtureProfileExtractor::fixture(),
            gaps: Vec::new(),
            risk_flags: Vec::new(),
            overall_score: 100,
            rationale: "Skill match: 3/3.".to_string(),
        };
        let snippets = Snippets {
            headline: "h".to_string(),
            bio: "b".to_string(),
            highlights: Vec::new(),
        };

        let receipt = persist(&store, &candidate_id, &enriched, &snippets)
            .await
            .expect("persist");
        persist(&store, &candidate_id, &enriched, &snippets)
            .await
            .expect("persist again");

        assert_eq!(receipt.key, "candidate:c1");
        assert_eq!(store.len(), 1);
        let stored: ReviewRecord =
            serde_json::from_value(store.get("candidate:c1").expect("record")).expect("decode");
        assert!(stored.approved);
        assert_eq!(stored.candidate_id, "c1");
        assert_eq!(stored.enriched, enriched);
    }
}
