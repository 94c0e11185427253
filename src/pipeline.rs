//! Translation pipeline
//!
//! Wires the stages into the per-message flow: recall reads the memory,
//! the assembler folds it into a context block, the generation client
//! produces a validated translation, and once the publishing layer has
//! posted and knows the destination URL, `commit` writes the pair back so
//! the next recall sees it. Messages are processed one at a time end to
//! end; each step's input is the previous step's output, and serializing
//! the flow is what makes each commit visible to the next recall without
//! store-level transactions.

use std::sync::Arc;

use tracing::{debug, info};

use crate::context::ContextAssembler;
use crate::embedding::Embedder;
use crate::error::{Result, RetellError};
use crate::generation::{GenerationBackend, GenerationClient};
use crate::recall::RecallEngine;
use crate::storage::Storage;
use crate::types::{IncomingPost, MemoryEntry, PipelineConfig, TranslatedPost};
use crate::writer::MemoryWriter;

/// End-to-end translation pipeline over one memory store
pub struct TranslationPipeline<B: GenerationBackend> {
    recall: RecallEngine,
    assembler: ContextAssembler,
    generator: GenerationClient<B>,
    writer: MemoryWriter,
}

impl<B: GenerationBackend> TranslationPipeline<B> {
    /// Build a pipeline. Fails fast when the embedder's output size does
    /// not match the store's configured dimensionality: every entry
    /// written through a mismatched pair would be invisible to search.
    pub fn new(
        storage: Storage,
        embedder: Arc<dyn Embedder>,
        backend: B,
        config: PipelineConfig,
    ) -> Result<Self> {
        if embedder.dimensions() != storage.config().dimensions {
            return Err(RetellError::Config(format!(
                "embedder produces {} dimensions but the store expects {}",
                embedder.dimensions(),
                storage.config().dimensions
            )));
        }

        Ok(Self {
            recall: RecallEngine::new(storage.clone(), embedder.clone(), config.recall),
            assembler: ContextAssembler::new(config.context),
            generator: GenerationClient::new(backend, config.generation),
            writer: MemoryWriter::new(storage, embedder),
        })
    }

    /// Translate one incoming post.
    ///
    /// Recall failures abort the run, with no silent empty-context fallback: a
    /// relay that quietly loses its memory produces exactly the repetitive
    /// posts the memory exists to prevent. Callers wanting degradation can
    /// catch [`RetellError::Recall`] and drive the generation client with
    /// an empty context themselves.
    ///
    /// Does not write to the store; call [`commit`](Self::commit) after
    /// publishing succeeds.
    pub async fn process(&self, post: &IncomingPost) -> Result<TranslatedPost> {
        if post.text.trim().is_empty() {
            return Err(RetellError::InvalidInput(
                "incoming post has no text".to_string(),
            ));
        }

        info!(
            message_id = %post.message_id,
            chars = post.text.chars().count(),
            has_enrichment = post.enrichment.is_some(),
            "processing post"
        );

        let candidates = self
            .recall
            .recall(&post.text, self.recall.config().k)
            .await?;

        let context = self.assembler.assemble(&candidates);
        debug!(
            context_lines = context.text.lines().count(),
            context_urls = context.urls.len(),
            "context assembled"
        );

        let result = self
            .generator
            .generate_with_editorial(
                &post.text,
                &context,
                post.enrichment.as_deref(),
                &post.candidate_urls,
            )
            .await?;

        info!(
            message_id = %post.message_id,
            chars = result.text.chars().count(),
            links = result.used_links.len(),
            attempts = result.attempts,
            "translation ready"
        );

        Ok(TranslatedPost {
            final_text: result.text,
            used_links: result.used_links,
        })
    }

    /// Persist a published translation into memory, keyed by the source
    /// message id. `reference_url` is where the translation ended up
    /// (known only after posting), so the commit is a separate step driven
    /// by the orchestrating caller.
    pub async fn commit(
        &self,
        post: &IncomingPost,
        translated: &TranslatedPost,
        reference_url: Option<&str>,
    ) -> Result<MemoryEntry> {
        self.writer
            .commit(
                &post.text,
                &translated.final_text,
                &post.message_id,
                reference_url,
            )
            .await
    }
}
