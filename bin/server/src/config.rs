//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, so `WORKFLOW__MOCK_APPROVAL=false` sets
//! [`WorkflowConfig::mock_approval`].

use resume_review_workflow::WorkflowConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// NATS server URL. Without it the step journal lives in memory.
    #[serde(default)]
    pub nats_url: Option<String>,

    /// Where completion notifications are posted when they are not mocked.
    #[serde(default)]
    pub notify_webhook_url: Option<String>,

    /// Interval between waitpoint pruning runs, in seconds.
    #[serde(default = "default_prune_interval_seconds")]
    pub prune_interval_seconds: u64,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_prune_interval_seconds() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            nats_url: None,
            notify_webhook_url: None,
            prune_interval_seconds: default_prune_interval_seconds(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
