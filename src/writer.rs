//! Memory commit
//!
//! Persists a finished source→translation pair so later recalls can see
//! it. The embedding covers source and translation combined, not the
//! source alone, so a future query (which embeds only the raw new message)
//! can match on either the topic of the news item or the phrasing of the
//! rendering. That asymmetry is deliberate and tested.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::error::{Result, RetellError};
use crate::storage::Storage;
use crate::types::{MemoryEntry, NewEntry};

/// Writes finished pairs into the translation memory
pub struct MemoryWriter {
    storage: Storage,
    embedder: Arc<dyn Embedder>,
}

impl MemoryWriter {
    pub fn new(storage: Storage, embedder: Arc<dyn Embedder>) -> Self {
        Self { storage, embedder }
    }

    /// Embed and upsert one pair, keyed by the caller's id.
    ///
    /// Idempotent: committing the same id twice updates the translation,
    /// embedding, and reference URL in place and keeps the original
    /// `created_at`. Safe to retry on [`RetellError::Write`].
    pub async fn commit(
        &self,
        source_text: &str,
        translation_text: &str,
        id: &str,
        reference_url: Option<&str>,
    ) -> Result<MemoryEntry> {
        if source_text.trim().is_empty() || translation_text.trim().is_empty() {
            return Err(RetellError::InvalidInput(
                "commit requires non-empty source and translation".to_string(),
            ));
        }
        if id.trim().is_empty() {
            return Err(RetellError::InvalidInput(
                "commit requires a non-empty id".to_string(),
            ));
        }

        let combined = format!("{}\n\n{}", source_text, translation_text);
        let embedding = self
            .embedder
            .embed(&combined)
            .await
            .map_err(|e| RetellError::Write(format!("pair embedding failed: {}", e)))?;

        let mut entry = NewEntry::new(id, source_text, translation_text, embedding);
        if let Some(url) = reference_url {
            entry = entry.with_reference_url(url);
        }

        let stored = self
            .storage
            .upsert(&entry)
            .map_err(|e| RetellError::Write(format!("upsert failed: {}", e)))?;

        info!(
            id = %stored.id,
            source_chars = source_text.chars().count(),
            translation_chars = translation_text.chars().count(),
            reference_url = reference_url.unwrap_or("-"),
            "pair committed to memory"
        );

        Ok(stored)
    }

    /// Commit a pair that has no natural id, minting a UUID for it.
    pub async fn commit_new(
        &self,
        source_text: &str,
        translation_text: &str,
        reference_url: Option<&str>,
    ) -> Result<MemoryEntry> {
        let id = Uuid::new_v4().to_string();
        self.commit(source_text, translation_text, &id, reference_url)
            .await
    }
}
