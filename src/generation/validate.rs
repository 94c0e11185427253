//! Generation output validation
//!
//! A translation only counts as succeeded when it is non-empty, fits the
//! character ceiling, and every URL in it can be traced back to the context
//! block or the source message. A hallucinated link is a correctness bug,
//! not a style issue, so it fails the whole generation.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, RetellError};

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("valid url pattern"));

/// Extract URLs in order of first appearance, deduplicated.
///
/// Trailing sentence punctuation is stripped so "see https://t.me/c/1."
/// yields the bare URL.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for m in URL_PATTERN.find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(&['.', ',', ';', ':', '!', '?'][..]);
        if url.is_empty() {
            continue;
        }
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }

    urls
}

/// Validate generated text against the output contract.
///
/// Returns the links actually used, in order of first appearance. Fails
/// with [`RetellError::InvalidOutput`] on empty output, output over
/// `max_chars` characters, or a URL outside `allowed`.
pub fn validate_output(
    text: &str,
    allowed: &HashSet<String>,
    max_chars: usize,
) -> Result<Vec<String>> {
    if text.trim().is_empty() {
        return Err(RetellError::InvalidOutput(
            "model returned no usable output text".to_string(),
        ));
    }

    let char_count = text.chars().count();
    if char_count > max_chars {
        return Err(RetellError::InvalidOutput(format!(
            "output is {} characters, ceiling is {}",
            char_count, max_chars
        )));
    }

    let used = extract_urls(text);
    for url in &used {
        if !allowed.contains(url) {
            return Err(RetellError::InvalidOutput(format!(
                "output links to '{}', which is not in the supplied context or source message",
                url
            )));
        }
    }

    Ok(used)
}
