//! Retell - translation relay core
//!
//! Translation-memory-augmented generation: past source→translation pairs
//! are stored with embeddings, recalled by blended similarity/recency for
//! each new post, folded into a bounded context block, and used to ground
//! a validated generation call whose output is committed back into memory.

pub mod context;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod recall;
pub mod storage;
pub mod types;
pub mod writer;

pub use context::{ContextAssembler, ContextBlock};
pub use error::{Result, RetellError};
pub use generation::{GenerationBackend, GenerationClient, GenerationResult};
pub use pipeline::TranslationPipeline;
pub use recall::RecallEngine;
pub use storage::Storage;
pub use types::*;
pub use writer::MemoryWriter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
