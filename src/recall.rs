//! Memory recall with blended similarity/recency ranking
//!
//! Pure similarity search over-favors old, heavily-represented topics; pure
//! recency ignores relevance. Recall over-fetches from the store and
//! re-ranks with a weighted blend so fresh, on-topic precedent beats
//! stale-but-similar precedent. This matters downstream: recalled entries
//! feed both stylistic consistency and link proposals, and a link to a very
//! old post is low-value.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::{Result, RetellError};
use crate::storage::Storage;
use crate::types::{MemoryEntry, RankedCandidate, RecallConfig};

/// Recall engine over the translation memory
pub struct RecallEngine {
    storage: Storage,
    embedder: Arc<dyn Embedder>,
    config: RecallConfig,
}

impl RecallEngine {
    pub fn new(storage: Storage, embedder: Arc<dyn Embedder>, config: RecallConfig) -> Self {
        Self {
            storage,
            embedder,
            config,
        }
    }

    /// Return at most `k` candidates ranked by combined score.
    ///
    /// The query embeds the raw message only, while stored entries embed
    /// source+translation combined. The asymmetry is intentional: a new
    /// message can match either the topic of a past source or the phrasing
    /// of a past rendering.
    ///
    /// Fails loud with [`RetellError::Recall`] on embedding or store
    /// failure; no retry, no silent empty-context fallback. Callers decide
    /// the fallback policy.
    pub async fn recall(&self, query_text: &str, k: usize) -> Result<Vec<RankedCandidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed(query_text)
            .await
            .map_err(|e| RetellError::Recall(format!("query embedding failed: {}", e)))?;

        // Over-fetch so the recency re-ranker has enough raw material to
        // meaningfully reorder without a second store query.
        let overfetch = self.config.overfetch_factor.max(1) * k;
        let raw = self
            .storage
            .similarity_search(&query, overfetch)
            .map_err(|e| RetellError::Recall(format!("similarity search failed: {}", e)))?;

        debug!(fetched = raw.len(), overfetch, "similarity search complete");

        let mut candidates = rank_candidates(raw, Utc::now(), &self.config);
        candidates.truncate(k);

        if candidates.is_empty() {
            info!("recall returned no candidates");
        } else {
            let avg_similarity = candidates.iter().map(|c| c.similarity as f64).sum::<f64>()
                / candidates.len() as f64;
            let avg_combined = candidates.iter().map(|c| c.combined as f64).sum::<f64>()
                / candidates.len() as f64;
            info!(
                returned = candidates.len(),
                k, avg_similarity, avg_combined, "recall re-ranked"
            );
        }

        Ok(candidates)
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }
}

/// Exponentially decayed age score in (0, 1].
///
/// 1.0 for an entry created this instant, 0.5 after one half-life, and so
/// on; never reaches zero.
pub fn recency_score(created_at: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f32) -> f32 {
    let age_hours = ((now - created_at).num_seconds().max(0) as f32) / 3600.0;
    let half_life = half_life_hours.max(f32::EPSILON);
    0.5_f32.powf(age_hours / half_life)
}

/// Score and reorder raw store results by the combined metric.
///
/// The sort is stable, so candidates with equal combined scores keep the
/// store's similarity-rank order, which keeps recall deterministic.
pub fn rank_candidates(
    raw: Vec<(MemoryEntry, f32)>,
    now: DateTime<Utc>,
    config: &RecallConfig,
) -> Vec<RankedCandidate> {
    let w = config.recency_weight.clamp(0.0, 1.0);

    let mut candidates: Vec<RankedCandidate> = raw
        .into_iter()
        .map(|(entry, raw_similarity)| {
            let similarity = raw_similarity.clamp(0.0, 1.0);
            let recency = recency_score(entry.created_at, now, config.recency_half_life_hours);
            RankedCandidate {
                combined: (1.0 - w) * similarity + w * recency,
                similarity,
                recency,
                entry,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry_at(id: &str, created_at: DateTime<Utc>) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            source_text: "src".to_string(),
            translation_text: "tgt".to_string(),
            embedding: vec![1.0, 0.0],
            reference_url: None,
            created_at,
        }
    }

    #[test]
    fn test_recency_score_half_life() {
        let now = Utc::now();
        let fresh = recency_score(now, now, 24.0);
        let half = recency_score(now - Duration::hours(24), now, 24.0);
        let quarter = recency_score(now - Duration::hours(48), now, 24.0);

        assert!((fresh - 1.0).abs() < 0.001);
        assert!((half - 0.5).abs() < 0.001);
        assert!((quarter - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_recency_never_reaches_zero() {
        let now = Utc::now();
        let ancient = recency_score(now - Duration::days(30), now, 24.0);
        assert!(ancient > 0.0);
        assert!(ancient < 0.001);
    }

    #[test]
    fn test_future_timestamps_clamp_to_fresh() {
        let now = Utc::now();
        let score = recency_score(now + Duration::hours(5), now, 24.0);
        assert!((score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_newer_entry_wins_at_equal_similarity() {
        let now = Utc::now();
        let raw = vec![
            (entry_at("old", now - Duration::hours(48)), 0.9),
            (entry_at("new", now), 0.9),
        ];

        let ranked = rank_candidates(raw, now, &RecallConfig::default());
        assert_eq!(ranked[0].entry.id, "new");
        assert!(ranked[0].combined > ranked[1].combined);
    }

    #[test]
    fn test_zero_weight_keeps_similarity_order() {
        let now = Utc::now();
        let config = RecallConfig {
            recency_weight: 0.0,
            ..Default::default()
        };
        let raw = vec![
            (entry_at("best", now - Duration::days(30)), 0.95),
            (entry_at("fresh", now), 0.60),
        ];

        let ranked = rank_candidates(raw, now, &config);
        assert_eq!(ranked[0].entry.id, "best");
    }

    #[test]
    fn test_similarity_clamped_to_unit_interval() {
        let now = Utc::now();
        let raw = vec![(entry_at("anti", now), -0.4)];
        let ranked = rank_candidates(raw, now, &RecallConfig::default());
        assert_eq!(ranked[0].similarity, 0.0);
    }

    #[test]
    fn test_stable_order_for_identical_scores() {
        let now = Utc::now();
        // Same created_at and same similarity: combined scores tie exactly,
        // so the incoming (similarity-rank) order must be preserved.
        let raw = vec![
            (entry_at("first", now), 0.8),
            (entry_at("second", now), 0.8),
        ];
        let ranked = rank_candidates(raw, now, &RecallConfig::default());
        assert_eq!(ranked[0].entry.id, "first");
        assert_eq!(ranked[1].entry.id, "second");
    }
}
