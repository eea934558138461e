//! Model calls for structured extraction.
//!
//! The workflow never talks to a provider directly. An embedder supplies an
//! [`LlmBackend`]; extraction operations hand it a prompt plus the JSON
//! schema the answer must follow and read back a JSON value.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A structured-output call: prompt in, JSON matching `output_schema` out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub output_schema: JsonValue,
    /// Extraction runs deterministic by default.
    #[serde(default)]
    pub temperature: f32,
}

impl LlmRequest {
    #[must_use]
    pub fn structured(prompt: impl Into<String>, output_schema: JsonValue) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            output_schema,
            temperature: 0.0,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// What the backend produced for an [`LlmRequest`].
///
/// Providers with native structured output fill `structured_output`; others
/// return the JSON document as text in `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default)]
    pub structured_output: Option<JsonValue>,
    #[serde(default)]
    pub usage: TokenUsage,
    pub model: String,
}

impl LlmResponse {
    /// The answer as JSON, taken from `structured_output` when present and
    /// parsed from `content` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ResponseParseFailed`] if neither holds JSON.
    pub fn into_json(self) -> Result<JsonValue, LlmError> {
        match self.structured_output {
            Some(value) => Ok(value),
            None => serde_json::from_str(self.content.trim()).map_err(|e| {
                LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                }
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A model provider able to answer structured-output requests.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the provider call fails or times out.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(content: &str, structured_output: Option<JsonValue>) -> LlmResponse {
        LlmResponse {
            content: content.to_string(),
            structured_output,
            usage: TokenUsage::default(),
            model: "test".to_string(),
        }
    }

    #[test]
    fn structured_requests_are_deterministic() {
        let request = LlmRequest::structured("Extract the profile", json!({"type": "object"}))
            .with_system("You are a recruiter.");

        assert_eq!(request.system.as_deref(), Some("You are a recruiter."));
        assert_eq!(request.output_schema, json!({"type": "object"}));
        assert_eq!(request.temperature, 0.0);
    }

    #[test]
    fn structured_output_wins_over_content() {
        let value = response("not json", Some(json!({"name": "Sam"})))
            .into_json()
            .expect("json");
        assert_eq!(value, json!({"name": "Sam"}));
    }

    #[test]
    fn content_is_parsed_when_no_structured_output() {
        let value = response(" {\"skills\": [\"Rust\"]}\n", None)
            .into_json()
            .expect("json");
        assert_eq!(value["skills"][0], "Rust");

        assert!(matches!(
            response("Sure! Here is the profile.", None).into_json(),
            Err(LlmError::ResponseParseFailed { .. })
        ));
    }

    #[test]
    fn token_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 1,
        };
        assert_eq!(usage.total(), u32::MAX);
    }
}
