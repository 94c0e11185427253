//! Embedding generation
//!
//! Supports two backends:
//! - OpenAI-compatible API (text-embedding-3-small) - requires `remote` feature
//! - TF-IDF fallback (no external dependencies, deterministic)
//!
//! Embedders are pure remote calls with no local state and no internal
//! retry; callers decide independently whether a failed call is retried.

mod tfidf;

pub use tfidf::TfIdfEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, RetellError};
use crate::types::EmbeddingConfig;

/// Trait for embedding generators
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// Empty or whitespace-only input is rejected with
    /// [`RetellError::Embedding`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible embedding client
///
/// Requires the `remote` feature. Works against OpenAI, OpenRouter, Azure
/// OpenAI, and other OpenAI-compatible APIs via `base_url`.
#[cfg(feature = "remote")]
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[cfg(feature = "remote")]
impl OpenAIEmbedder {
    /// Create an embedder from configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            RetellError::Config("api_key required for the openai embedding backend".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config
                .embedding_model
                .clone()
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dimensions: config.dimensions,
        })
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RetellError::Embedding(
                "cannot embed empty text".to_string(),
            ));
        }

        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "input": text,
                "model": self.model,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetellError::Embedding(format!(
                "Embedding API error {}: {}",
                status, body
            )));
        }

        let data: serde_json::Value = response.json().await?;
        let embedding: Vec<f32> = data["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| RetellError::Embedding("Invalid response format".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        // Entries with the wrong dimensionality would poison similarity
        // search, so mismatches are rejected here rather than at write time.
        if embedding.len() != self.dimensions {
            return Err(RetellError::Embedding(format!(
                "Embedding dimensions mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Create an embedder from configuration.
///
/// Available backends:
/// - `"tfidf"`: always available, deterministic, no external dependencies
/// - `"openai"`: requires the `remote` feature and an API key
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.model.as_str() {
        #[cfg(feature = "remote")]
        "openai" => Ok(Arc::new(OpenAIEmbedder::from_config(config)?)),
        #[cfg(not(feature = "remote"))]
        "openai" => Err(RetellError::Config(
            "the openai embedding backend requires the 'remote' feature".to_string(),
        )),
        "tfidf" => Ok(Arc::new(TfIdfEmbedder::new(config.dimensions))),
        other => Err(RetellError::Config(format!(
            "Unknown embedding backend: '{}'. Use 'openai' or 'tfidf'",
            other
        ))),
    }
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
