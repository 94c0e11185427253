//! Context block assembly
//!
//! Formats ranked candidates into the bounded textual block injected into
//! the generation prompt. Pure, no I/O. Previews are deliberately short:
//! the model should know the gist of past translations (to avoid repeating
//! itself and to propose links), not their full text to copy from.

use crate::types::{ContextConfig, RankedCandidate};

/// A rendered context block plus the reference URLs it mentions.
///
/// The URL list feeds link-closure validation: a generated post may only
/// link to URLs from this block or from the source message itself.
#[derive(Debug, Clone, Default)]
pub struct ContextBlock {
    pub text: String,
    pub urls: Vec<String>,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Formats ranked candidates into a context block
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Render candidates as enumerated preview lines, in the given
    /// (already ranked) order:
    ///
    /// ```text
    /// 1. Parliament approves the budget in a late-night session → https://t.me/chan/123
    /// 2. Budget talks collapse for the third time
    /// ```
    ///
    /// An empty candidate list renders as an empty block.
    pub fn assemble(&self, candidates: &[RankedCandidate]) -> ContextBlock {
        let mut lines = Vec::new();
        let mut urls = Vec::new();

        for (i, candidate) in candidates.iter().take(self.config.max_entries).enumerate() {
            let preview = preview_of(
                &candidate.entry.translation_text,
                self.config.preview_max_chars,
            );

            match candidate.entry.reference_url.as_deref() {
                Some(url) => {
                    lines.push(format!("{}. {} → {}", i + 1, preview, url));
                    urls.push(url.to_string());
                }
                None => lines.push(format!("{}. {}", i + 1, preview)),
            }
        }

        ContextBlock {
            text: lines.join("\n"),
            urls,
        }
    }
}

/// First sentence (or first line, whichever ends sooner) of the text,
/// truncated to `max_chars` characters. Keeps every entry on one line so
/// the enumerated block stays parseable.
fn preview_of(text: &str, max_chars: usize) -> String {
    let first_sentence = text
        .split(|c| c == '.' || c == '\n')
        .next()
        .unwrap_or(text);
    first_sentence
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim()
        .to_string()
}
