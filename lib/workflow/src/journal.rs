//! Durable record of run progress.
//!
//! The journal is the source of truth for resuming a run. A run writes:
//!
//! 1. `RunQueued` with the submitted input
//! 2. `StepCompleted` with the output of each step, before the next starts
//! 3. `RunFinished` with the final result
//!
//! Replaying the entries for a run gives back its [`RunHistory`]; steps with
//! a recorded output are skipped on resume and their output reused.

use crate::envelope::{Envelope, RawEnvelope};
use crate::model::{CandidateInput, WorkflowResult};
use crate::step::Step;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resume_review_core::WorkflowRunId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// One journaled fact about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEntry {
    RunQueued {
        run_id: WorkflowRunId,
        input: CandidateInput,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        run_id: WorkflowRunId,
        step: Step,
        output: JsonValue,
        timestamp: DateTime<Utc>,
    },
    RunFinished {
        run_id: WorkflowRunId,
        result: WorkflowResult,
        timestamp: DateTime<Utc>,
    },
}

impl JournalEntry {
    #[must_use]
    pub fn run_id(&self) -> WorkflowRunId {
        match self {
            Self::RunQueued { run_id, .. }
            | Self::StepCompleted { run_id, .. }
            | Self::RunFinished { run_id, .. } => *run_id,
        }
    }
}

/// Errors from journal operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// Could not reach the journal backend.
    ConnectionFailed { message: String },
    /// Failed to append an entry.
    AppendFailed { message: String },
    /// Failed to read entries back.
    LoadFailed { message: String },
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { message } => {
                write!(f, "journal connection failed: {message}")
            }
            Self::AppendFailed { message } => write!(f, "journal append failed: {message}"),
            Self::LoadFailed { message } => write!(f, "journal load failed: {message}"),
        }
    }
}

impl std::error::Error for JournalError {}

/// Append-only storage for journal entries.
#[async_trait]
pub trait StepJournal: Send + Sync {
    /// Durably appends an entry.
    async fn append(&self, entry: Envelope<JournalEntry>) -> Result<(), JournalError>;

    /// Loads every entry for a run, in append order.
    async fn load(&self, run_id: WorkflowRunId) -> Result<Vec<JournalEntry>, JournalError>;
}

/// Decodes one stored record, rejecting versions this build cannot read.
pub(crate) fn decode_entry(bytes: &[u8]) -> Result<JournalEntry, JournalError> {
    let raw = RawEnvelope::from_json_bytes(bytes).map_err(|e| JournalError::LoadFailed {
        message: format!("failed to decode envelope: {e}"),
    })?;
    if !raw.is_readable() {
        return Err(JournalError::LoadFailed {
            message: format!("unsupported record version {}", raw.version),
        });
    }
    raw.decode()
        .map(Envelope::into_payload)
        .map_err(|e| JournalError::LoadFailed {
            message: format!("failed to decode entry: {e}"),
        })
}

/// Process-local journal.
///
/// Entries are stored encoded, exactly as a remote journal would see them,
/// so the encode and decode paths are exercised in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJournal {
    records: Arc<RwLock<Vec<(WorkflowRunId, Vec<u8>)>>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all runs.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StepJournal for InMemoryJournal {
    async fn append(&self, entry: Envelope<JournalEntry>) -> Result<(), JournalError> {
        let run_id = entry.payload().run_id();
        let bytes = entry.to_json_bytes().map_err(|e| JournalError::AppendFailed {
            message: format!("failed to encode entry: {e}"),
        })?;
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((run_id, bytes));
        Ok(())
    }

    async fn load(&self, run_id: WorkflowRunId) -> Result<Vec<JournalEntry>, JournalError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .filter(|(id, _)| *id == run_id)
            .map(|(_, bytes)| decode_entry(bytes))
            .collect()
    }
}

/// State of a run reconstructed from its journal.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHistory {
    pub run_id: WorkflowRunId,
    pub input: CandidateInput,
    pub completed: HashMap<Step, JsonValue>,
    pub finished: Option<WorkflowResult>,
}

impl RunHistory {
    /// Folds a run's entries into its history.
    ///
    /// Returns `None` if the run was never queued. A later output for the
    /// same step replaces an earlier one.
    #[must_use]
    pub fn replay(run_id: WorkflowRunId, entries: Vec<JournalEntry>) -> Option<Self> {
        let mut history: Option<Self> = None;
        for entry in entries {
            match entry {
                JournalEntry::RunQueued { input, .. } => {
                    history = Some(Self {
                        run_id,
                        input,
                        completed: HashMap::new(),
                        finished: None,
                    });
                }
                JournalEntry::StepCompleted { step, output, .. } => {
                    if let Some(history) = history.as_mut() {
                        history.completed.insert(step, output);
                    }
                }
                JournalEntry::RunFinished { result, .. } => {
                    if let Some(history) = history.as_mut() {
                        history.finished = Some(result);
                    }
                }
            }
        }
        history
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queued(run_id: WorkflowRunId) -> JournalEntry {
        JournalEntry::RunQueued {
            run_id,
            input: CandidateInput::new("c1"),
            timestamp: Utc::now(),
        }
    }

    fn completed(run_id: WorkflowRunId, step: Step, output: JsonValue) -> JournalEntry {
        JournalEntry::StepCompleted {
            run_id,
            step,
            output,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_journal_separates_runs() {
        let journal = InMemoryJournal::new();
        let first = WorkflowRunId::new();
        let second = WorkflowRunId::new();

        journal.append(Envelope::new(queued(first))).await.expect("append");
        journal.append(Envelope::new(queued(second))).await.expect("append");
        journal
            .append(Envelope::new(completed(first, Step::Ingest, json!({}))))
            .await
            .expect("append");

        assert_eq!(journal.len(), 3);
        let entries = journal.load(first).await.expect("load");
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.run_id() == first));
    }

    #[test]
    fn entries_are_tagged_by_type() {
        let run_id = WorkflowRunId::new();
        let json = serde_json::to_value(completed(run_id, Step::AgentEnrich, json!({"x": 1})))
            .expect("encode");
        assert_eq!(json["type"], "step_completed");
        assert_eq!(json["step"], "agent-enrich");
    }

    #[test]
    fn replay_collects_outputs_and_final_result() {
        let run_id = WorkflowRunId::new();
        let entries = vec![
            queued(run_id),
            completed(run_id, Step::Validate, json!({"candidateId": "c1"})),
            completed(run_id, Step::Ingest, json!({"resumeText": "a"})),
            completed(run_id, Step::Ingest, json!({"resumeText": "b"})),
        ];

        let history = RunHistory::replay(run_id, entries).expect("history");
        assert_eq!(history.input.candidate_label(), "c1");
        assert_eq!(history.completed.len(), 2);
        assert_eq!(history.completed[&Step::Ingest]["resumeText"], "b");
        assert!(!history.is_finished());
    }

    #[test]
    fn replay_without_queue_entry_is_none() {
        let run_id = WorkflowRunId::new();
        let entries = vec![completed(run_id, Step::Validate, json!({}))];
        assert!(RunHistory::replay(run_id, entries).is_none());
    }

    #[test]
    fn unreadable_versions_are_rejected() {
        let bytes = serde_json::to_vec(&json!({"version": 99, "payload": {}})).expect("encode");
        assert!(matches!(
            decode_entry(&bytes),
            Err(JournalError::LoadFailed { .. })
        ));
    }
}
