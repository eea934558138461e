//! The resume-review pipeline.
//!
//! One orchestrator drives one run through:
//!
//! 1. validate
//! 2. ingest
//! 3. extract
//! 4. agent-enrich
//! 5. generate-snippets
//! 6. human-approval (a rejection ends the run here)
//! 7. persist
//! 8. notify
//!
//! Each step is reported as `running` then `completed` or `error`. The run
//! itself opens with `workflow/started` and ends with exactly one of
//! `workflow/completed` or `workflow/error`.

use crate::config::WorkflowConfig;
use crate::envelope::Envelope;
use crate::error::{ErrorKind, StepError};
use crate::executor::StepExecutor;
use crate::journal::JournalEntry;
use crate::model::{
    ApprovalResult, CandidateInput, EnrichedProfile, Snippets, ValidatedInput, WorkflowResult,
};
use crate::progress::{
    ApprovalRequest, Failure, Progress, ProgressEmitter, ProgressEvent, StepOutput,
};
use crate::step::Step;
use crate::steps::enrich::EnrichTools;
use crate::steps::notify::NotifyOutcome;
use crate::steps::{approval, enrich, extract, ingest, notify, persist, snippets, validate};
use crate::waitpoint::{WaitpointRegistry, WebhookToken};
use chrono::Utc;
use resume_review_ai::{
    FixtureProfileExtractor, FixtureWebSearch, ProfileExtractor, RubricScorer, Scorer, WebSearch,
};
use resume_review_core::CandidateId;
use resume_review_integration::{
    FixtureSources, InMemoryProfileStore, LogNotifier, Notifier, ProfileStore, SourceFetcher,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::{self, Future};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The external operations a run calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub sources: Arc<dyn SourceFetcher>,
    pub extractor: Arc<dyn ProfileExtractor>,
    pub search: Arc<dyn WebSearch>,
    pub scorer: Arc<dyn Scorer>,
    pub store: Arc<dyn ProfileStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Deterministic collaborators that make no network calls.
    pub fn fixtures() -> Self {
        Self {
            sources: Arc::new(FixtureSources),
            extractor: Arc::new(FixtureProfileExtractor),
            search: Arc::new(FixtureWebSearch),
            scorer: Arc::new(RubricScorer),
            store: Arc::new(InMemoryProfileStore::new()),
            notifier: Arc::new(LogNotifier),
        }
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Arc<dyn SourceFetcher>) -> Self {
        self.sources = sources;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn ProfileExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Drives a single run from input to [`WorkflowResult`].
pub struct ReviewOrchestrator {
    config: Arc<WorkflowConfig>,
    collaborators: Arc<Collaborators>,
    waitpoints: WaitpointRegistry<ApprovalResult>,
    executor: StepExecutor,
    emitter: Arc<ProgressEmitter>,
}

impl ReviewOrchestrator {
    pub fn new(
        config: Arc<WorkflowConfig>,
        collaborators: Arc<Collaborators>,
        waitpoints: WaitpointRegistry<ApprovalResult>,
        executor: StepExecutor,
        emitter: Arc<ProgressEmitter>,
    ) -> Self {
        Self {
            config,
            collaborators,
            waitpoints,
            executor,
            emitter,
        }
    }

    /// Runs the pipeline to the end. Never fails: step errors become a
    /// `failed` result and a `workflow/error` event.
    #[instrument(
        name = "review_run",
        skip_all,
        fields(run_id = %self.executor.run_id(), candidate_id = input.candidate_label())
    )]
    pub async fn run(self, input: CandidateInput) -> WorkflowResult {
        self.emitter
            .emit(ProgressEvent::new(
                Step::Workflow,
                Progress::Started {
                    candidate_id: input.candidate_id.clone(),
                },
            ))
            .await;

        let result = match self.pipeline(&input).await {
            Ok(result) => {
                info!(approved = result.approved, "review completed");
                self.emitter
                    .emit(ProgressEvent::completed(
                        Step::Workflow,
                        Some(StepOutput::Finished(Box::new(result.clone()))),
                    ))
                    .await;
                result
            }
            Err(e) => {
                warn!(kind = %e.kind, error = %e, "review failed");
                self.emitter
                    .emit(ProgressEvent::failed(
                        Step::Workflow,
                        Failure::fatal(e.kind, e.message),
                    ))
                    .await;
                WorkflowResult::failed(input.candidate_label())
            }
        };

        self.record_finish(&result).await;
        result
    }

    async fn pipeline(&self, input: &CandidateInput) -> Result<WorkflowResult, StepError> {
        let require_sources = !self.config.mock_sources;
        let validated: ValidatedInput = self
            .step(
                Step::Validate,
                || future::ready(validate::validate(input, require_sources)),
                |_| None,
            )
            .await?;

        let raw = self
            .step(
                Step::Ingest,
                || ingest::ingest(self.collaborators.sources.as_ref(), &validated.sources),
                |raw| Some(StepOutput::Ingested(ingest::summarize(raw))),
            )
            .await?;

        let extracted = self
            .step(
                Step::Extract,
                || future::ready(Ok(extract::extract(&raw))),
                |extracted| {
                    Some(StepOutput::Extracted {
                        tokens: extracted.tokens,
                    })
                },
            )
            .await?;

        let tools = EnrichTools {
            extractor: self.collaborators.extractor.as_ref(),
            search: self.collaborators.search.as_ref(),
            scorer: self.collaborators.scorer.as_ref(),
        };
        let enriched = self
            .step(
                Step::AgentEnrich,
                || {
                    enrich::enrich(
                        tools,
                        &extracted,
                        validated.job_context.as_ref(),
                        &self.emitter,
                    )
                },
                |enriched| Some(StepOutput::Enriched(enrich::summarize(enriched))),
            )
            .await?;

        let snippets = self
            .step(
                Step::GenerateSnippets,
                || future::ready(Ok(snippets::generate(&enriched))),
                |_| None,
            )
            .await?;

        let approval = self
            .step(
                Step::HumanApproval,
                || self.approve(&validated, &enriched, &snippets),
                |approval| Some(StepOutput::Decided(approval.clone())),
            )
            .await?;

        let candidate_id = &validated.candidate_id;
        if !approval.approved {
            info!(reason = ?approval.reason, "candidate rejected, skipping persist and notify");
            return Ok(WorkflowResult::completed(
                candidate_id,
                approval,
                enriched,
                snippets,
            ));
        }

        self.step(
            Step::Persist,
            || {
                persist::persist(
                    self.collaborators.store.as_ref(),
                    candidate_id,
                    &enriched,
                    &snippets,
                )
            },
            |_| None,
        )
        .await?;

        let notify_error = self.notify(candidate_id, approval.approved).await?;

        let mut result = WorkflowResult::completed(candidate_id, approval, enriched, snippets);
        result.notify_error = notify_error;
        Ok(result)
    }

    /// Runs one step between its `running` and `completed`/`error` events.
    async fn step<T, F, Fut>(
        &self,
        step: Step,
        op: F,
        summarize: impl FnOnce(&T) -> Option<StepOutput>,
    ) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        self.emitter.emit(ProgressEvent::running(step)).await;
        match self.executor.run(step, op).await {
            Ok(run) => {
                if run.replayed {
                    info!(%step, "reused recorded output");
                }
                self.emitter
                    .emit(ProgressEvent::completed(step, summarize(&run.output)))
                    .await;
                Ok(run.output)
            }
            Err(e) => {
                warn!(%step, kind = %e.kind, error = %e, "step failed");
                self.emitter
                    .emit(ProgressEvent::failed(
                        step,
                        Failure::fatal(e.kind, e.message.clone()),
                    ))
                    .await;
                Err(e)
            }
        }
    }

    async fn approve(
        &self,
        validated: &ValidatedInput,
        enriched: &EnrichedProfile,
        snippets: &Snippets,
    ) -> Result<ApprovalResult, StepError> {
        if self.config.mock_approval {
            return Ok(approval::auto_approve());
        }

        let token =
            WebhookToken::for_approval(validated.candidate_id.as_str(), self.executor.run_id());
        let request = ApprovalRequest {
            webhook_token: token.to_string(),
            candidate_id: validated.candidate_id.to_string(),
            snippets: snippets.clone(),
            score: enriched.overall_score,
        };
        approval::request_approval(
            &self.waitpoints,
            &self.emitter,
            request,
            self.config.approval_timeout(),
        )
        .await
    }

    /// Sends the completion notification. A delivery failure is reported as
    /// a non-fatal `notify/error` and returned as the run's notify error.
    async fn notify(
        &self,
        candidate_id: &CandidateId,
        approved: bool,
    ) -> Result<Option<String>, StepError> {
        self.emitter.emit(ProgressEvent::running(Step::Notify)).await;
        let run = self
            .executor
            .run(Step::Notify, || self.deliver(candidate_id, approved))
            .await;

        match run {
            Ok(run) => match run.output {
                NotifyOutcome::Delivered => {
                    self.emitter
                        .emit(ProgressEvent::completed(Step::Notify, None))
                        .await;
                    Ok(None)
                }
                NotifyOutcome::Failed { message } => {
                    self.emitter
                        .emit(ProgressEvent::failed(
                            Step::Notify,
                            Failure::non_fatal(ErrorKind::External, message.clone()),
                        ))
                        .await;
                    Ok(Some(message))
                }
            },
            Err(e) => {
                self.emitter
                    .emit(ProgressEvent::failed(
                        Step::Notify,
                        Failure::fatal(e.kind, e.message.clone()),
                    ))
                    .await;
                Err(e)
            }
        }
    }

    async fn deliver(
        &self,
        candidate_id: &CandidateId,
        approved: bool,
    ) -> Result<NotifyOutcome, StepError> {
        Ok(notify::notify(self.collaborators.notifier.as_ref(), candidate_id, approved).await)
    }

    async fn record_finish(&self, result: &WorkflowResult) {
        let entry = JournalEntry::RunFinished {
            run_id: self.executor.run_id(),
            result: result.clone(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.executor.journal().append(Envelope::new(entry)).await {
            warn!(error = %e, "failed to record run result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RetryPolicy;
    use crate::journal::{InMemoryJournal, RunHistory, StepJournal};
    use crate::progress::{ChannelSink, ProgressRecord};
    use async_trait::async_trait;
    use resume_review_ai::AiError;
    use resume_review_ai::profile::{EducationDraft, ExperienceDraft, ProfileDraft};
    use resume_review_core::WorkflowRunId;
    use resume_review_integration::{ConnectorError, RawSources, SourceLocators};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Harness {
        orchestrator: ReviewOrchestrator,
        journal: Arc<InMemoryJournal>,
        run_id: WorkflowRunId,
        rx: mpsc::Receiver<String>,
    }

    fn harness(config: WorkflowConfig, collaborators: Collaborators) -> Harness {
        let journal = Arc::new(InMemoryJournal::new());
        let run_id = WorkflowRunId::new();
        let (tx, rx) = mpsc::channel(256);
        let executor = StepExecutor::new(
            run_id,
            journal.clone(),
            config.retry.clone(),
            HashMap::new(),
        );
        let orchestrator = ReviewOrchestrator::new(
            Arc::new(config),
            Arc::new(collaborators),
            WaitpointRegistry::new(),
            executor,
            Arc::new(ProgressEmitter::new(ChannelSink::new(tx))),
        );
        Harness {
            orchestrator,
            journal,
            run_id,
            rx,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<ProgressRecord> {
        let mut records = Vec::new();
        while let Ok(line) = rx.try_recv() {
            records.push(ProgressRecord::parse(&line).expect("progress line"));
        }
        records
    }

    struct TitlelessExtractor;

    #[async_trait]
    impl ProfileExtractor for TitlelessExtractor {
        async fn extract(&self, _text: &str) -> Result<ProfileDraft, AiError> {
            Ok(ProfileDraft {
                name: Some("Sam".to_string()),
                experience: Some(vec![ExperienceDraft {
                    company: Some("Acme".to_string()),
                    ..ExperienceDraft::default()
                }]),
                ..ProfileDraft::default()
            })
        }
    }

    #[tokio::test]
    async fn schema_failure_ends_the_run() {
        let Harness {
            orchestrator,
            journal,
            run_id,
            mut rx,
        } = harness(
            WorkflowConfig::default(),
            Collaborators::fixtures().with_extractor(Arc::new(TitlelessExtractor)),
        );

        let result = orchestrator.run(CandidateInput::new("c1")).await;
        assert!(result.is_failed());
        assert_eq!(result.candidate_id, "c1");

        let records = drain(&mut rx);
        let failed: Vec<&ProgressRecord> = records
            .iter()
            .filter(|r| r.label().ends_with("/error"))
            .collect();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].label(), "agent-enrich/error");
        assert_eq!(failed[1].label(), "workflow/error");
        let data = failed[1].data.as_ref().expect("data");
        assert_eq!(data["kind"], "schema");
        assert!(
            data["message"]
                .as_str()
                .expect("message")
                .contains("missing required fields")
        );
        assert!(!records.iter().any(|r| r.step == "generate-snippets"));

        let history = RunHistory::replay(run_id, journal.load(run_id).await.expect("load"))
            .expect("history");
        assert!(history.finished.as_ref().is_some_and(WorkflowResult::is_failed));
        assert!(!history.completed.contains_key(&Step::AgentEnrich));
    }

    struct SchoollessExtractor;

    #[async_trait]
    impl ProfileExtractor for SchoollessExtractor {
        async fn extract(&self, _text: &str) -> Result<ProfileDraft, AiError> {
            Ok(ProfileDraft {
                name: Some("Sam".to_string()),
                experience: Some(vec![ExperienceDraft {
                    company: Some("Acme".to_string()),
                    title: Some("Engineer".to_string()),
                    ..ExperienceDraft::default()
                }]),
                education: Some(vec![EducationDraft {
                    degree: Some("BS".to_string()),
                    ..EducationDraft::default()
                }]),
                ..ProfileDraft::default()
            })
        }
    }

    #[tokio::test]
    async fn education_without_school_still_completes() {
        let Harness {
            orchestrator,
            mut rx,
            ..
        } = harness(
            WorkflowConfig::default(),
            Collaborators::fixtures().with_extractor(Arc::new(SchoollessExtractor)),
        );

        let result = orchestrator.run(CandidateInput::new("c1")).await;
        assert!(!result.is_failed());
        let education = &result.enriched.as_ref().expect("enriched").canonical.education;
        assert_eq!(education.len(), 1);
        assert_eq!(education[0].school, None);
        assert_eq!(education[0].degree.as_deref(), Some("BS"));

        let records = drain(&mut rx);
        assert!(!records.iter().any(|r| r.label().ends_with("/error")));
        assert_eq!(
            records.last().map(ProgressRecord::label).as_deref(),
            Some("workflow/completed")
        );
    }

    /// Fails the first fetch, then serves fixtures.
    #[derive(Default)]
    struct FlakySources {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SourceFetcher for FlakySources {
        async fn fetch(&self, locators: &SourceLocators) -> Result<RawSources, ConnectorError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ConnectorError::ConnectionFailed {
                    url: "https://files.example.com/resume.txt".to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            FixtureSources.fetch(locators).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_ingest_failures_are_retried() {
        let sources = Arc::new(FlakySources::default());
        let Harness {
            orchestrator,
            mut rx,
            ..
        } = harness(
            WorkflowConfig {
                retry: RetryPolicy::new(3, Duration::from_millis(50)),
                ..WorkflowConfig::default()
            },
            Collaborators::fixtures().with_sources(sources.clone()),
        );

        let result = orchestrator.run(CandidateInput::new("c1")).await;
        assert!(result.approved);
        assert_eq!(sources.calls.load(Ordering::SeqCst), 2);

        let ingest: Vec<String> = drain(&mut rx)
            .iter()
            .map(ProgressRecord::label)
            .filter(|l| l.starts_with("ingest/"))
            .collect();
        assert_eq!(ingest, vec!["ingest/running", "ingest/completed"]);
    }
}
