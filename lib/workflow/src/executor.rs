//! Runs individual steps with journaling, replay and retry.

use crate::envelope::Envelope;
use crate::error::StepError;
use crate::journal::{JournalEntry, StepJournal};
use crate::step::Step;
use chrono::Utc;
use resume_review_core::WorkflowRunId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff schedule for retryable step failures.
///
/// Only idempotent steps are retried, and only for retryable error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 1 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_multiplier() -> u32 {
    2
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: u64::try_from(initial_backoff.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }

    fn attempts_for(&self, step: Step) -> u32 {
        if step.is_idempotent() {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// A step's output and whether it came from the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRun<T> {
    pub output: T,
    pub replayed: bool,
}

/// Executes the steps of one run.
///
/// Outputs already in the journal are returned without running the step
/// again; fresh outputs are appended before they are returned.
pub struct StepExecutor {
    run_id: WorkflowRunId,
    journal: Arc<dyn StepJournal>,
    retry: RetryPolicy,
    recorded: HashMap<Step, JsonValue>,
}

impl StepExecutor {
    pub fn new(
        run_id: WorkflowRunId,
        journal: Arc<dyn StepJournal>,
        retry: RetryPolicy,
        recorded: HashMap<Step, JsonValue>,
    ) -> Self {
        Self {
            run_id,
            journal,
            retry,
            recorded,
        }
    }

    #[must_use]
    pub fn run_id(&self) -> WorkflowRunId {
        self.run_id
    }

    #[must_use]
    pub fn journal(&self) -> &Arc<dyn StepJournal> {
        &self.journal
    }

    /// Runs `op` for `step`, or replays its recorded output.
    ///
    /// # Errors
    ///
    /// Returns the step's last error once attempts are exhausted, or a
    /// journal error if the output cannot be recorded or replayed.
    pub async fn run<T, F, Fut>(&self, step: Step, mut op: F) -> Result<StepRun<T>, StepError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        if let Some(recorded) = self.recorded.get(&step) {
            let output = serde_json::from_value(recorded.clone()).map_err(|e| {
                StepError::journal(format!("recorded output for {step} is unreadable: {e}"))
            })?;
            debug!(run_id = %self.run_id, %step, "replaying recorded step output");
            return Ok(StepRun {
                output,
                replayed: true,
            });
        }

        let attempts = self.retry.attempts_for(step);
        let mut attempt = 1;
        let output = loop {
            match op().await {
                Ok(output) => break output,
                Err(e) if e.kind.is_retryable() && attempt < attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        run_id = %self.run_id,
                        %step,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        self.record(step, &output).await?;
        Ok(StepRun {
            output,
            replayed: false,
        })
    }

    async fn record<T: Serialize>(&self, step: Step, output: &T) -> Result<(), StepError> {
        let output = serde_json::to_value(output)
            .map_err(|e| StepError::journal(format!("failed to encode {step} output: {e}")))?;
        self.journal
            .append(Envelope::new(JournalEntry::StepCompleted {
                run_id: self.run_id,
                step,
                output,
                timestamp: Utc::now(),
            }))
            .await?;
        Ok(())
    }
}
