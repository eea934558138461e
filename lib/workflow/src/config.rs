//! Workflow behaviour switches and limits.

use crate::executor::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Settings for the resume-review workflow.
///
/// Deserialized from the `WORKFLOW__*` environment variables by the server;
/// every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowConfig {
    /// Use fixture sources instead of fetching locators.
    #[serde(default = "default_true")]
    pub mock_sources: bool,

    /// Approve automatically instead of waiting for a reviewer.
    #[serde(default = "default_true")]
    pub mock_approval: bool,

    /// Log notifications instead of delivering them.
    #[serde(default = "default_true")]
    pub mock_notifications: bool,

    /// Use the fixture profile extractor instead of an LLM backend.
    #[serde(default = "default_true")]
    pub mock_llm: bool,

    /// How long a run waits for a reviewer. 0 waits forever.
    #[serde(default = "default_approval_timeout_seconds")]
    pub approval_timeout_seconds: u64,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Progress lines buffered per run before the run waits on its reader.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,

    /// How long settled approval tokens are remembered.
    #[serde(default = "default_waitpoint_retention_seconds")]
    pub waitpoint_retention_seconds: u64,
}

fn default_true() -> bool {
    true
}

fn default_approval_timeout_seconds() -> u64 {
    24 * 60 * 60
}

fn default_progress_buffer() -> usize {
    64
}

fn default_waitpoint_retention_seconds() -> u64 {
    60 * 60
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mock_sources: default_true(),
            mock_approval: default_true(),
            mock_notifications: default_true(),
            mock_llm: default_true(),
            approval_timeout_seconds: default_approval_timeout_seconds(),
            retry: RetryPolicy::default(),
            progress_buffer: default_progress_buffer(),
            waitpoint_retention_seconds: default_waitpoint_retention_seconds(),
        }
    }
}

impl WorkflowConfig {
    #[must_use]
    pub fn approval_timeout(&self) -> Option<Duration> {
        (self.approval_timeout_seconds > 0).then(|| Duration::from_secs(self.approval_timeout_seconds))
    }

    #[must_use]
    pub fn waitpoint_retention(&self) -> Duration {
        Duration::from_secs(self.waitpoint_retention_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_uses_defaults() {
        let config: WorkflowConfig = serde_json::from_value(json!({})).expect("deserialize");
        assert_eq!(config, WorkflowConfig::default());
        assert!(config.mock_sources && config.mock_approval && config.mock_notifications);
        assert_eq!(config.approval_timeout(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let config: WorkflowConfig =
            serde_json::from_value(json!({"approval_timeout_seconds": 0, "retry": {"max_attempts": 3}}))
                .expect("deserialize");
        assert_eq!(config.approval_timeout(), None);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 200);
    }
}
