//! Wiring the engine from configuration.

use crate::config::ServerConfig;
use crate::error::ServerError;
use resume_review_integration::{HttpSourceFetcher, WebhookNotifier};
use resume_review_workflow::{
    Collaborators, InMemoryJournal, NatsConfig, NatsStepJournal, StepJournal, WorkflowEngine,
};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::info;

/// Picks fixture or real collaborators according to the mock flags.
///
/// # Errors
///
/// Returns a configuration error if a real collaborator is requested but
/// cannot be built from the configuration.
pub fn collaborators(
    config: &ServerConfig,
    client: &reqwest::Client,
) -> Result<Collaborators, Report<ServerError>> {
    let workflow = &config.workflow;
    let mut collaborators = Collaborators::fixtures();

    if !workflow.mock_sources {
        collaborators =
            collaborators.with_sources(Arc::new(HttpSourceFetcher::new(client.clone())));
    }

    if !workflow.mock_notifications {
        let url = config
            .notify_webhook_url
            .clone()
            .ok_or_else(|| ServerError::Config {
                details: "NOTIFY_WEBHOOK_URL is required when WORKFLOW__MOCK_NOTIFICATIONS is false"
                    .to_string(),
            })?;
        collaborators =
            collaborators.with_notifier(Arc::new(WebhookNotifier::new(client.clone(), url)));
    }

    if !workflow.mock_llm {
        return Err(ServerError::Config {
            details: "no LLM backend is configured; set WORKFLOW__MOCK_LLM=true or embed the \
                      engine with an LlmProfileExtractor"
                .to_string(),
        }
        .into());
    }

    info!(
        mock_sources = workflow.mock_sources,
        mock_approval = workflow.mock_approval,
        mock_notifications = workflow.mock_notifications,
        "collaborators selected"
    );
    Ok(collaborators)
}

/// Opens the JetStream journal when `NATS_URL` is set, otherwise an
/// in-memory one.
///
/// # Errors
///
/// Returns a journal error if NATS cannot be reached.
pub async fn journal(config: &ServerConfig) -> Result<Arc<dyn StepJournal>, Report<ServerError>> {
    match &config.nats_url {
        Some(url) => {
            let journal = NatsStepJournal::connect(NatsConfig::new(url.clone()))
                .await
                .map_err(|e| ServerError::Journal {
                    details: e.to_string(),
                })?;
            Ok(Arc::new(journal))
        }
        None => {
            info!("NATS_URL not set, runs are journaled in memory only");
            Ok(Arc::new(InMemoryJournal::new()))
        }
    }
}

/// Builds the engine described by `config`.
///
/// # Errors
///
/// Returns an error if collaborators or the journal cannot be set up.
pub async fn engine(config: &ServerConfig) -> Result<WorkflowEngine, Report<ServerError>> {
    let client = reqwest::Client::new();
    let collaborators = collaborators(config, &client)?;
    let journal = journal(config).await?;
    Ok(WorkflowEngine::new(
        config.workflow.clone(),
        collaborators,
        journal,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_review_workflow::WorkflowConfig;

    fn config(workflow: WorkflowConfig) -> ServerConfig {
        ServerConfig {
            workflow,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn mocked_configuration_builds() {
        let client = reqwest::Client::new();
        assert!(collaborators(&config(WorkflowConfig::default()), &client).is_ok());
    }

    #[test]
    fn real_notifications_need_a_webhook_url() {
        let client = reqwest::Client::new();
        let workflow = WorkflowConfig {
            mock_notifications: false,
            ..WorkflowConfig::default()
        };

        let err = collaborators(&config(workflow.clone()), &client)
            .err()
            .expect("missing url");
        assert!(err.to_string().contains("NOTIFY_WEBHOOK_URL"));

        let with_url = ServerConfig {
            notify_webhook_url: Some("https://hooks.example.com/review".to_string()),
            ..config(workflow)
        };
        assert!(collaborators(&with_url, &client).is_ok());
    }

    #[test]
    fn real_llm_without_backend_is_rejected() {
        let client = reqwest::Client::new();
        let workflow = WorkflowConfig {
            mock_llm: false,
            ..WorkflowConfig::default()
        };
        assert!(collaborators(&config(workflow), &client).is_err());
    }

    #[tokio::test]
    async fn journal_defaults_to_memory() {
        let journal = journal(&ServerConfig::default()).await.expect("journal");
        let run_id = resume_review_core::WorkflowRunId::new();
        assert!(journal.load(run_id).await.expect("load").is_empty());
    }
}
