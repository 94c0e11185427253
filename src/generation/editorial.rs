//! Editorial review pass
//!
//! Optional critique→revision cycle after the first draft: an editor call
//! reviews the translation against the translator's own instructions and
//! the context block, then the translator revises with the critique in
//! hand. Bounded by `editorial_iterations` (default 0, i.e. off); each
//! extra iteration costs two model calls.

use tracing::{debug, info};

use crate::context::ContextBlock;
use crate::error::Result;

use super::{allowed_urls, GenerationBackend, GenerationClient, GenerationResult, NO_MEMORY_TEXT};

const CRITIQUE_TEMPLATE: &str = "\
You are the channel's senior editor. The translator was given these \
instructions:

{translator_instructions}

Source text:
{source_text}

Their translation:
{translation_text}

Previous posts for reference:
{memory_list}

Point out concrete problems: repetition of earlier posts, factual drift, \
broken voice, weak phrasing. Be specific and brief. If the translation is \
fine as-is, reply with nothing.";

const REVISION_TEMPLATE: &str = "\
REVISION {iteration}

Source text:
{source_text}

Your current translation:
{translation_text}

Editor's critique:
{critique}

Address the critique and produce the next version of the translation. Keep \
everything that already works.";

impl<B: GenerationBackend> GenerationClient<B> {
    /// Generate, then run the configured number of critique→revision
    /// cycles. Every revision goes through the same retry loop and the
    /// same output validation as the initial draft.
    pub async fn generate_with_editorial(
        &self,
        input_text: &str,
        context: &ContextBlock,
        enrichment: Option<&str>,
        candidate_urls: &[String],
    ) -> Result<GenerationResult> {
        let mut result = self
            .generate(input_text, context, enrichment, candidate_urls)
            .await?;

        for iteration in 1..=self.config.editorial_iterations {
            let critique = self.critique(input_text, &result.text, context).await?;
            if critique.trim().is_empty() {
                debug!(iteration, "editor had no objections, stopping early");
                break;
            }

            info!(iteration, "applying editorial critique");
            result = self
                .revise(
                    input_text,
                    context,
                    enrichment,
                    candidate_urls,
                    &result.text,
                    &critique,
                    iteration,
                )
                .await?;
        }

        Ok(result)
    }

    async fn critique(
        &self,
        source_text: &str,
        translation_text: &str,
        context: &ContextBlock,
    ) -> Result<String> {
        let memory_list = if context.is_empty() {
            NO_MEMORY_TEXT
        } else {
            &context.text
        };

        let translator_instructions = self
            .build_request(source_text, context, None)
            .system_prompt;

        let user_message = CRITIQUE_TEMPLATE
            .replace("{translator_instructions}", &translator_instructions)
            .replace("{source_text}", source_text)
            .replace("{translation_text}", translation_text)
            .replace("{memory_list}", memory_list);

        // The editor speaks freely; its output is advice, not a post, so it
        // skips the output contract.
        let request = self.request_with(String::new(), user_message);
        let (response, _) = self.complete_with_retry(&request).await?;
        Ok(response.text)
    }

    #[allow(clippy::too_many_arguments)]
    async fn revise(
        &self,
        input_text: &str,
        context: &ContextBlock,
        enrichment: Option<&str>,
        candidate_urls: &[String],
        current_translation: &str,
        critique: &str,
        iteration: u32,
    ) -> Result<GenerationResult> {
        let system_prompt = self
            .build_request(input_text, context, enrichment)
            .system_prompt;

        let user_message = REVISION_TEMPLATE
            .replace("{iteration}", &iteration.to_string())
            .replace("{source_text}", input_text)
            .replace("{translation_text}", current_translation)
            .replace("{critique}", critique);

        let request = self.request_with(system_prompt, user_message);
        let allowed = allowed_urls(context, candidate_urls);

        let (response, attempts) = self.complete_with_retry(&request).await?;
        self.into_result(response, attempts, &allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetellError;
    use crate::types::GenerationConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use super::super::{CompletionResponse, GenerationRequest};

    /// Backend answering from a fixed script, one entry per call
    struct ScriptedBackend {
        script: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(responses: &[&str]) -> Self {
            Self {
                script: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn complete(&self, _request: &GenerationRequest) -> Result<CompletionResponse> {
            let text = self
                .script
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| RetellError::Generation("script exhausted".to_string()))?;
            Ok(CompletionResponse {
                text,
                ..Default::default()
            })
        }

        fn model_id(&self) -> &str {
            "scripted-test"
        }
    }

    fn config(iterations: u32) -> GenerationConfig {
        GenerationConfig {
            editorial_iterations: iterations,
            retry_base_delay_ms: 1,
            retry_jitter_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_editorial_applies_revision() {
        let backend = ScriptedBackend::new(&["draft", "too dry, punch it up", "final version"]);
        let client = GenerationClient::new(backend, config(1));

        let result = client
            .generate_with_editorial("source", &ContextBlock::default(), None, &[])
            .await
            .unwrap();
        assert_eq!(result.text, "final version");
    }

    #[tokio::test]
    async fn test_editorial_stops_on_empty_critique() {
        // Script has no third entry: an empty critique must end the loop
        // without a revision call.
        let backend = ScriptedBackend::new(&["draft", ""]);
        let client = GenerationClient::new(backend, config(1));

        let result = client
            .generate_with_editorial("source", &ContextBlock::default(), None, &[])
            .await
            .unwrap();
        assert_eq!(result.text, "draft");
    }

    #[tokio::test]
    async fn test_zero_iterations_is_plain_generate() {
        let backend = ScriptedBackend::new(&["draft"]);
        let client = GenerationClient::new(backend, config(0));

        let result = client
            .generate_with_editorial("source", &ContextBlock::default(), None, &[])
            .await
            .unwrap();
        assert_eq!(result.text, "draft");
    }

    #[tokio::test]
    async fn test_revision_is_validated() {
        // The revision hallucinates a link; the whole generation must fail.
        let backend = ScriptedBackend::new(&[
            "draft",
            "add a link",
            "revised, see https://invented.example/1",
        ]);
        let client = GenerationClient::new(backend, config(1));

        let err = client
            .generate_with_editorial("source", &ContextBlock::default(), None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RetellError::InvalidOutput(_)));
    }
}
