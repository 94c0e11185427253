//! Generation backend port
//!
//! Abstract interface for the model call so the client's retry and
//! validation logic can be exercised against scripted backends in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A fully assembled generation request. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fixed system instructions with the context block substituted in
    pub system_prompt: String,
    /// Input text, optionally extended with enrichment
    pub user_message: String,
    /// Token budget passed to the model
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Raw model response, before output validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Concatenated text content. Empty when the model produced no usable
    /// output (e.g. a reasoning-only response); the client treats that as
    /// a validation failure, not a transport failure.
    pub text: String,
    /// Model that produced the response
    pub model: String,
    /// Tokens in the prompt
    pub input_tokens: u32,
    /// Tokens in the completion
    pub output_tokens: u32,
}

/// Backend interface for a single generation call.
///
/// Implementations classify failures via [`crate::RetellError`]: transport
/// problems, rate limits, and 5xx responses are retryable; everything else
/// is terminal. No retry happens at this layer.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue one request and return the raw response
    async fn complete(&self, request: &GenerationRequest) -> Result<CompletionResponse>;

    /// Model identifier used for logging
    fn model_id(&self) -> &str;
}

/// Anthropic messages API configuration
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Per-request timeout in seconds; a timeout is treated like any other
    /// transport error and follows the client's retry rules
    pub timeout_secs: u64,
}

#[cfg(feature = "remote")]
impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Anthropic messages API backend
///
/// Requires the `remote` feature.
#[cfg(feature = "remote")]
pub struct AnthropicBackend {
    client: reqwest::Client,
    config: AnthropicConfig,
}

#[cfg(feature = "remote")]
impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn complete(&self, request: &GenerationRequest) -> Result<CompletionResponse> {
        use crate::error::RetellError;

        let url = format!("{}/v1/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&serde_json::json!({
                "model": self.config.model,
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "system": request.system_prompt,
                "messages": [
                    {"role": "user", "content": request.user_message}
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(RetellError::RateLimited(retry_after));
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetellError::Upstream(format!(
                "Messages API error {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            // Auth and request errors won't get better on retry
            let body = response.text().await.unwrap_or_default();
            return Err(RetellError::Generation(format!(
                "Messages API error {}: {}",
                status, body
            )));
        }

        let data: serde_json::Value = response.json().await?;

        // Only text blocks count as output; thinking blocks are skipped, so
        // a reasoning-only response comes back with empty text and fails
        // validation downstream.
        let text: String = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"].as_str() == Some("text"))
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            model: data["model"]
                .as_str()
                .unwrap_or(&self.config.model)
                .to_string(),
            input_tokens: data["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: data["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        })
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(all(test, feature = "remote"))]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_config_defaults() {
        let config = AnthropicConfig::new("key");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.timeout_secs, 120);
    }
}
