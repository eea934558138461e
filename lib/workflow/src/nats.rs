//! NATS JetStream-backed step journal.
//!
//! Entries for a run are published to `review.run.<run_id>` on a file-backed
//! stream, so a restarted server can replay any run that was in flight.

use crate::envelope::Envelope;
use crate::journal::{JournalEntry, JournalError, StepJournal, decode_entry};
use async_nats::jetstream;
use async_trait::async_trait;
use futures::StreamExt;
use resume_review_core::WorkflowRunId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Subject prefix for run journal entries.
const RUN_SUBJECT_PREFIX: &str = "review.run";

/// Default stream name for the journal.
const JOURNAL_STREAM_NAME: &str = "REVIEW_JOURNAL";

/// How long to wait for the next message before treating a replay as done.
const REPLAY_IDLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection settings for the NATS journal.
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URL.
    pub url: String,
    /// Stream name (defaults to REVIEW_JOURNAL).
    pub stream_name: Option<String>,
}

impl NatsConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream_name: None,
        }
    }

    fn stream(&self) -> &str {
        self.stream_name.as_deref().unwrap_or(JOURNAL_STREAM_NAME)
    }
}

/// Journal stored on a JetStream stream, one subject per run.
pub struct NatsStepJournal {
    jetstream: Arc<jetstream::Context>,
    config: NatsConfig,
}

impl NatsStepJournal {
    /// Connects and makes sure the journal stream exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or stream setup fails.
    pub async fn connect(config: NatsConfig) -> Result<Self, JournalError> {
        let client = async_nats::connect(&config.url).await.map_err(|e| {
            JournalError::ConnectionFailed {
                message: e.to_string(),
            }
        })?;
        let jetstream = async_nats::jetstream::new(client);

        let stream_config = jetstream::stream::Config {
            name: config.stream().to_string(),
            subjects: vec![format!("{RUN_SUBJECT_PREFIX}.>")],
            storage: jetstream::stream::StorageType::File,
            retention: jetstream::stream::RetentionPolicy::Limits,
            ..Default::default()
        };
        jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| JournalError::ConnectionFailed {
                message: format!("failed to create journal stream: {e}"),
            })?;

        info!(url = %config.url, stream = config.stream(), "connected to NATS journal");
        Ok(Self {
            jetstream: Arc::new(jetstream),
            config,
        })
    }

    fn run_subject(run_id: WorkflowRunId) -> String {
        format!("{RUN_SUBJECT_PREFIX}.{run_id}")
    }
}

#[async_trait]
impl StepJournal for NatsStepJournal {
    async fn append(&self, entry: Envelope<JournalEntry>) -> Result<(), JournalError> {
        let subject = Self::run_subject(entry.payload().run_id());
        let bytes = entry.to_json_bytes().map_err(|e| JournalError::AppendFailed {
            message: format!("failed to encode entry: {e}"),
        })?;

        // The second await waits for the server ack, which is what makes
        // the entry durable.
        self.jetstream
            .publish(subject, bytes.into())
            .await
            .map_err(|e| JournalError::AppendFailed {
                message: e.to_string(),
            })?
            .await
            .map_err(|e| JournalError::AppendFailed {
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn load(&self, run_id: WorkflowRunId) -> Result<Vec<JournalEntry>, JournalError> {
        let stream = self
            .jetstream
            .get_stream(self.config.stream())
            .await
            .map_err(|e| JournalError::LoadFailed {
                message: format!("failed to get stream: {e}"),
            })?;

        let consumer = stream
            .create_consumer(jetstream::consumer::pull::Config {
                filter_subject: Self::run_subject(run_id),
                deliver_policy: jetstream::consumer::DeliverPolicy::All,
                ..Default::default()
            })
            .await
            .map_err(|e| JournalError::LoadFailed {
                message: format!("failed to create consumer: {e}"),
            })?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| JournalError::LoadFailed {
                message: format!("failed to get messages: {e}"),
            })?;

        let mut entries = Vec::new();
        while let Ok(Some(message)) = tokio::time::timeout(REPLAY_IDLE_TIMEOUT, messages.next()).await
        {
            let message = message.map_err(|e| JournalError::LoadFailed {
                message: e.to_string(),
            })?;
            entries.push(decode_entry(&message.payload)?);
            message.ack().await.map_err(|e| JournalError::LoadFailed {
                message: format!("failed to ack entry: {e}"),
            })?;
        }

        debug!(%run_id, entries = entries.len(), "replayed run journal");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_defaults() {
        let config = NatsConfig::new("nats://localhost:4222");
        assert_eq!(config.stream(), JOURNAL_STREAM_NAME);

        let custom = NatsConfig {
            stream_name: Some("REVIEW_TEST".to_string()),
            ..config
        };
        assert_eq!(custom.stream(), "REVIEW_TEST");
    }

    #[test]
    fn each_run_has_its_own_subject() {
        let run_id = WorkflowRunId::new();
        let subject = NatsStepJournal::run_subject(run_id);
        assert_eq!(subject, format!("review.run.{run_id}"));
        assert_ne!(subject, NatsStepJournal::run_subject(WorkflowRunId::new()));
    }
}
