//! Downstream notifications about finished reviews.

use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// A message about a reviewed candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub candidate_id: String,
    pub approved: bool,
}

impl Notification {
    /// Human-readable summary line.
    #[must_use]
    pub fn text(&self) -> String {
        format!(
            "Candidate {} review complete. Approved: {}",
            self.candidate_id, self.approved
        )
    }
}

/// Delivers notifications to a team channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    async fn notify(&self, notification: &Notification) -> Result<(), ConnectorError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ConnectorError> {
        info!(
            candidate_id = %notification.candidate_id,
            approved = notification.approved,
            "notified #recruiting"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookBody {
    text: String,
}

/// Posts `{"text": ...}` to an incoming-webhook URL (Slack style).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url`.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ConnectorError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookBody {
                text: notification.text(),
            })
            .send()
            .await
            .map_err(|e| ConnectorError::ConnectionFailed {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::UnexpectedStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
