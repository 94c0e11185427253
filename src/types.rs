//! Core types for Retell

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted source→translation pair with its embedding.
///
/// Entries are immutable once written: an upsert with the same id replaces
/// `translation_text`/`embedding`/`reference_url` but never touches
/// `created_at` (first write wins on the timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier, caller-supplied (typically derived from the source
    /// message id) or a generated UUID
    pub id: String,
    /// Original untranslated text
    pub source_text: String,
    /// Generated translation
    pub translation_text: String,
    /// Combined source+translation embedding, fixed dimension
    pub embedding: Vec<f32>,
    /// Public URL where the translation was published, if known
    pub reference_url: Option<String>,
    /// When the pair was first persisted
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a new pair.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub id: String,
    pub source_text: String,
    pub translation_text: String,
    pub embedding: Vec<f32>,
    pub reference_url: Option<String>,
    /// Creation timestamp override. `None` means "now". Ignored when an
    /// entry with the same id already exists.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewEntry {
    pub fn new(
        id: impl Into<String>,
        source_text: impl Into<String>,
        translation_text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            source_text: source_text.into(),
            translation_text: translation_text.into(),
            embedding,
            reference_url: None,
            created_at: None,
        }
    }

    pub fn with_reference_url(mut self, url: impl Into<String>) -> Self {
        self.reference_url = Some(url.into());
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// A recalled entry scored for a specific query. Ephemeral: produced per
/// query, consumed by the context assembler, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub entry: MemoryEntry,
    /// Cosine similarity to the query, clamped to [0, 1]
    pub similarity: f32,
    /// Exponentially decayed age score in [0, 1]; 1.0 = just created
    pub recency: f32,
    /// `(1 - w) * similarity + w * recency`
    pub combined: f32,
}

/// What the message-ingestion layer hands to the pipeline.
///
/// The core does not parse messages or fetch articles; `enrichment` is
/// pre-extracted article body text and `candidate_urls` are pre-parsed from
/// message formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingPost {
    /// Stable id of the source message; also keys the memory commit
    pub message_id: String,
    /// Message text to translate
    pub text: String,
    /// Optional extracted article body appended to the input
    #[serde(default)]
    pub enrichment: Option<String>,
    /// URLs carried by the source message itself
    #[serde(default)]
    pub candidate_urls: Vec<String>,
}

impl IncomingPost {
    pub fn new(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            text: text.into(),
            enrichment: None,
            candidate_urls: Vec::new(),
        }
    }
}

/// What the pipeline returns to the publishing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedPost {
    /// Validated translation, ready to post
    pub final_text: String,
    /// URLs actually embedded in the text, in order of first appearance
    pub used_links: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path, or ":memory:"
    pub db_path: String,
    /// Embedding dimensionality enforced at write time
    pub dimensions: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "retell.db".to_string(),
            dimensions: 1536,
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend to use: "openai" or "tfidf"
    pub model: String,
    /// API key (for the openai backend)
    pub api_key: Option<String>,
    /// OpenAI-compatible API base URL (for OpenRouter, Azure, etc.)
    pub base_url: Option<String>,
    /// Embedding model name override (e.g. "text-embedding-3-small")
    pub embedding_model: Option<String>,
    /// Embedding dimensions (must match model output)
    pub dimensions: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "openai".to_string(),
            api_key: None,
            base_url: None,
            embedding_model: None,
            dimensions: 1536,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Recall ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Number of candidates returned per query
    pub k: usize,
    /// Over-fetch multiplier: the store is asked for `overfetch_factor * k`
    /// neighbors so the recency re-ranker has raw material to reorder
    pub overfetch_factor: usize,
    /// Half-life of the recency score, in hours
    pub recency_half_life_hours: f32,
    /// Blend weight `w` in [0, 1]: combined = (1-w)*similarity + w*recency
    pub recency_weight: f32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            k: 10,
            overfetch_factor: 4,
            recency_half_life_hours: 24.0,
            recency_weight: 0.3,
        }
    }
}

/// Context block formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum number of entries rendered into the block
    pub max_entries: usize,
    /// Per-entry preview length in characters
    pub preview_max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            preview_max_chars: 120,
        }
    }
}

/// Generation client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Hard ceiling on output length, in characters rather than tokens:
    /// the target is a human-readable post
    pub max_output_chars: usize,
    /// Token budget passed to the model
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Total attempt ceiling, including the first attempt
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds)
    pub retry_base_delay_ms: u64,
    /// Cap on the backoff delay (milliseconds)
    pub retry_max_delay_ms: u64,
    /// Random jitter added to each backoff sleep (milliseconds)
    pub retry_jitter_ms: u64,
    /// Editorial critique→revision cycles after the first draft (0 = off)
    pub editorial_iterations: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_chars: 4000,
            max_tokens: 2048,
            temperature: 0.8,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8000,
            retry_jitter_ms: 250,
            editorial_iterations: 0,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}
