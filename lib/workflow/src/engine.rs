//! Run lifecycle: starting, resuming and answering runs.
//!
//! Every run executes on its own task and streams progress lines through a
//! bounded channel to whoever holds its [`RunHandle`]. Dropping the handle
//! (or its event stream) does not stop the run.

use crate::config::WorkflowConfig;
use crate::envelope::Envelope;
use crate::error::{EngineError, ErrorKind};
use crate::executor::StepExecutor;
use crate::journal::{JournalEntry, RunHistory, StepJournal};
use crate::model::{ApprovalResult, CandidateInput, WorkflowResult};
use crate::orchestrator::{Collaborators, ReviewOrchestrator};
use crate::progress::{ChannelSink, Failure, ProgressEmitter, ProgressEvent};
use crate::step::Step;
use crate::waitpoint::{PendingWaitpoint, WaitpointError, WaitpointRegistry, WebhookToken};
use chrono::Utc;
use futures::StreamExt;
use resume_review_core::WorkflowRunId;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, instrument};

/// Starts and resumes resume-review runs.
///
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct WorkflowEngine {
    config: Arc<WorkflowConfig>,
    collaborators: Arc<Collaborators>,
    journal: Arc<dyn StepJournal>,
    waitpoints: WaitpointRegistry<ApprovalResult>,
    active: Arc<Mutex<HashSet<WorkflowRunId>>>,
}

impl WorkflowEngine {
    pub fn new(
        config: WorkflowConfig,
        collaborators: Collaborators,
        journal: Arc<dyn StepJournal>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            collaborators: Arc::new(collaborators),
            journal,
            waitpoints: WaitpointRegistry::new(),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Queues a new run and starts it.
    ///
    /// # Errors
    ///
    /// Returns a journal error if the run cannot be recorded.
    #[instrument(skip_all, fields(candidate_id = input.candidate_label()))]
    pub async fn start(&self, input: CandidateInput) -> Result<RunHandle, EngineError> {
        let run_id = WorkflowRunId::new();
        self.journal
            .append(Envelope::new(JournalEntry::RunQueued {
                run_id,
                input: input.clone(),
                timestamp: Utc::now(),
            }))
            .await?;

        let claim = self.claim(run_id)?;
        info!(%run_id, "run queued");
        Ok(self.launch(claim, input, HashMap::new()))
    }

    /// Restarts an unfinished run from its journal.
    ///
    /// Steps with a recorded output are not executed again.
    ///
    /// # Errors
    ///
    /// - `RunInProgress` if the run is still executing here
    /// - `RunNotFound` if the journal has no such run
    /// - `RunAlreadyTerminal` if the run already finished
    /// - `Journal` if the journal cannot be read
    #[instrument(skip(self))]
    pub async fn resume(&self, run_id: WorkflowRunId) -> Result<RunHandle, EngineError> {
        let claim = self.claim(run_id)?;
        let entries = self.journal.load(run_id).await?;
        let history =
            RunHistory::replay(run_id, entries).ok_or(EngineError::RunNotFound { run_id })?;
        if history.is_finished() {
            return Err(EngineError::RunAlreadyTerminal { run_id });
        }

        info!(%run_id, recorded = history.completed.len(), "resuming run");
        Ok(self.launch(claim, history.input, history.completed))
    }

    /// Delivers a reviewer's decision to the run waiting on `token`.
    ///
    /// # Errors
    ///
    /// Returns the waitpoint error if the token cannot be resolved.
    pub fn resolve_approval(
        &self,
        token: &WebhookToken,
        decision: ApprovalResult,
    ) -> Result<(), WaitpointError> {
        self.waitpoints.resolve(token, decision)
    }

    /// Approvals still waiting for a reviewer, oldest first.
    #[must_use]
    pub fn pending_approvals(&self) -> Vec<PendingWaitpoint> {
        self.waitpoints.pending()
    }

    /// Forgets settled approval tokens older than the retention window.
    pub fn prune_waitpoints(&self) -> usize {
        self.waitpoints.prune(self.config.waitpoint_retention())
    }

    #[must_use]
    pub fn is_active(&self, run_id: WorkflowRunId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&run_id)
    }

    fn claim(&self, run_id: WorkflowRunId) -> Result<RunClaim, EngineError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(run_id) {
            return Err(EngineError::RunInProgress { run_id });
        }
        Ok(RunClaim {
            run_id,
            active: Arc::clone(&self.active),
        })
    }

    fn launch(
        &self,
        claim: RunClaim,
        input: CandidateInput,
        recorded: HashMap<Step, JsonValue>,
    ) -> RunHandle {
        let run_id = claim.run_id;
        let (tx, rx) = mpsc::channel(self.config.progress_buffer.max(1));
        let emitter = Arc::new(ProgressEmitter::new(ChannelSink::new(tx)));
        let executor = StepExecutor::new(
            run_id,
            Arc::clone(&self.journal),
            self.config.retry.clone(),
            recorded,
        );
        let orchestrator = ReviewOrchestrator::new(
            Arc::clone(&self.config),
            Arc::clone(&self.collaborators),
            self.waitpoints.clone(),
            executor,
            Arc::clone(&emitter),
        );
        let candidate_label = input.candidate_label().to_string();

        // The supervisor outlives a panicking run so the stream still ends
        // with a terminal event.
        let task = tokio::spawn(async move {
            let _claim = claim;
            match tokio::spawn(orchestrator.run(input)).await {
                Ok(result) => result,
                Err(e) => {
                    error!(%run_id, error = %e, "run task aborted");
                    emitter
                        .emit(ProgressEvent::failed(
                            Step::Workflow,
                            Failure::fatal(ErrorKind::Internal, format!("run aborted: {e}")),
                        ))
                        .await;
                    WorkflowResult::failed(candidate_label)
                }
            }
        });

        RunHandle {
            run_id,
            events: ReceiverStream::new(rx),
            task,
        }
    }
}

/// Marks a run as executing until dropped.
struct RunClaim {
    run_id: WorkflowRunId,
    active: Arc<Mutex<HashSet<WorkflowRunId>>>,
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.run_id);
    }
}

/// A started run: its progress lines and its eventual result.
pub struct RunHandle {
    run_id: WorkflowRunId,
    events: ReceiverStream<String>,
    task: JoinHandle<WorkflowResult>,
}

impl RunHandle {
    #[must_use]
    pub fn run_id(&self) -> WorkflowRunId {
        self.run_id
    }

    /// Next progress line, or `None` once the run has ended.
    pub async fn next_line(&mut self) -> Option<String> {
        self.events.next().await
    }

    /// Gives up the result and keeps only the progress lines.
    pub fn into_events(self) -> ReceiverStream<String> {
        self.events
    }

    /// Waits for the run's result, discarding unread progress.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if the run task was cancelled.
    pub async fn wait(self) -> Result<WorkflowResult, EngineError> {
        let run_id = self.run_id;
        drop(self.events);
        self.task.await.map_err(|e| EngineError::TaskFailed {
            run_id,
            reason: e.to_string(),
        })
    }

    /// Reads every remaining progress line, then the result.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` if the run task was cancelled.
    pub async fn collect(mut self) -> Result<(Vec<String>, WorkflowResult), EngineError> {
        let mut lines = Vec::new();
        while let Some(line) = self.events.next().await {
            lines.push(line);
        }
        let result = self.wait().await?;
        Ok((lines, result))
    }
}
