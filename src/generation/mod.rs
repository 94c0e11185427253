//! Generation client
//!
//! Builds the model request (system instructions + context block + input),
//! drives the call through a bounded retry loop, and validates the output
//! before reporting success. Fail-fast on anything that survives the retry
//! budget: a broken translation is worse than a missing one.

pub mod backend;
mod editorial;
mod validate;

pub use backend::{CompletionResponse, GenerationBackend, GenerationRequest};
#[cfg(feature = "remote")]
pub use backend::{AnthropicBackend, AnthropicConfig};
pub use validate::extract_urls;

use std::collections::HashSet;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::ContextBlock;
use crate::error::{Result, RetellError};
use crate::types::GenerationConfig;

/// System instructions. Only the structure is fixed: a length ceiling, a
/// factual-accuracy mandate, an anti-repetition mandate referencing the
/// context block, and the link rules that make the closure check meaningful.
const SYSTEM_TEMPLATE: &str = "\
You are the channel's translator-editor. Rewrite the incoming post in the \
channel's established voice for its audience.

Hard rules:
- Keep every fact, number, name, and quote accurate. Add nothing you cannot \
source from the input.
- Stay under {max_chars} characters.
- Do not reuse the phrasing, jokes, or framing of the previous posts listed \
below. They are context for what has already been said, not material to copy.
- You may reference related earlier posts inline as Markdown links, but only \
with URLs that appear in the previous-posts list or in the source message \
itself. Never invent a URL.

Previous posts:
{memory_list}";

/// Rendered in place of the context block when memory is empty
const NO_MEMORY_TEXT: &str = "(no previous posts)";

/// A validated generation outcome. Ephemeral; on success the text seeds a
/// new memory entry via the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Validated output text
    pub text: String,
    /// URLs used in the output, all proven to come from the allowed set
    pub used_links: Vec<String>,
    /// Attempts the final successful call took (1 = no retries)
    pub attempts: u32,
}

/// Exponential backoff schedule: `base * 2^(n-1)`, capped.
///
/// Kept as its own type so the delay progression is a testable invariant
/// rather than arithmetic buried in the retry loop.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetrySchedule {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before the retry following failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Client driving generation calls against a backend
pub struct GenerationClient<B: GenerationBackend> {
    backend: B,
    config: GenerationConfig,
}

impl<B: GenerationBackend> GenerationClient<B> {
    pub fn new(backend: B, config: GenerationConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Assemble the request for a translation call.
    ///
    /// Enrichment (pre-extracted article body) is appended to the user
    /// message; an empty context block renders as the no-memory placeholder
    /// rather than an empty section.
    pub fn build_request(
        &self,
        input_text: &str,
        context: &ContextBlock,
        enrichment: Option<&str>,
    ) -> GenerationRequest {
        let memory_list = if context.is_empty() {
            NO_MEMORY_TEXT
        } else {
            &context.text
        };

        let system_prompt = SYSTEM_TEMPLATE
            .replace("{max_chars}", &self.config.max_output_chars.to_string())
            .replace("{memory_list}", memory_list);

        let user_message = match enrichment {
            Some(body) if !body.trim().is_empty() => {
                format!("{}\n\n---\nFull article text:\n{}", input_text, body)
            }
            _ => input_text.to_string(),
        };

        self.request_with(system_prompt, user_message)
    }

    fn request_with(&self, system_prompt: String, user_message: String) -> GenerationRequest {
        GenerationRequest {
            system_prompt,
            user_message,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Translate `input_text` with the given context.
    ///
    /// Retries only transport-class failures, up to the attempt ceiling,
    /// with exponential backoff. Validation failures (empty output,
    /// over-length output, a link outside `candidate_urls` plus the
    /// context URLs) are terminal and surface as
    /// [`RetellError::InvalidOutput`].
    pub async fn generate(
        &self,
        input_text: &str,
        context: &ContextBlock,
        enrichment: Option<&str>,
        candidate_urls: &[String],
    ) -> Result<GenerationResult> {
        let request = self.build_request(input_text, context, enrichment);
        let allowed = allowed_urls(context, candidate_urls);

        let (response, attempts) = self.complete_with_retry(&request).await?;
        self.into_result(response, attempts, &allowed)
    }

    fn into_result(
        &self,
        response: CompletionResponse,
        attempts: u32,
        allowed: &HashSet<String>,
    ) -> Result<GenerationResult> {
        let text = response.text.trim().to_string();
        let used_links = validate::validate_output(&text, allowed, self.config.max_output_chars)?;

        debug!(
            chars = text.chars().count(),
            links = used_links.len(),
            attempts,
            "generation validated"
        );

        Ok(GenerationResult {
            text,
            used_links,
            attempts,
        })
    }

    /// One bounded pass through the retry state machine.
    ///
    /// pending → (retryable error, attempts left) → retrying → …
    ///         → (retryable error, ceiling hit)   → failed
    ///         → (terminal error)                  → failed
    ///         → (response)                        → returned for validation
    async fn complete_with_retry(
        &self,
        request: &GenerationRequest,
    ) -> Result<(CompletionResponse, u32)> {
        let max_attempts = self.config.max_attempts.max(1);
        let schedule = RetrySchedule::new(
            self.config.retry_base_delay_ms,
            self.config.retry_max_delay_ms,
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.complete(request).await {
                Ok(response) => return Ok((response, attempt)),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let jitter = if self.config.retry_jitter_ms > 0 {
                        rand::thread_rng().gen_range(0..=self.config.retry_jitter_ms)
                    } else {
                        0
                    };
                    let delay = schedule.delay_for(attempt) + Duration::from_millis(jitter);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        model = self.backend.model_id(),
                        error = %e,
                        "generation attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(RetellError::Generation(format!(
                        "giving up after {} attempts: {}",
                        attempt, e
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn allowed_urls(context: &ContextBlock, candidate_urls: &[String]) -> HashSet<String> {
    candidate_urls
        .iter()
        .cloned()
        .chain(context.urls.iter().cloned())
        .collect()
}
