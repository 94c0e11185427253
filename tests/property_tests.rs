//! Property-based tests for retell
//!
//! Invariants that must hold for all inputs:
//! - Recency decay is strictly monotonic and bounded
//! - Ranking respects the blend weight at the extremes
//! - Context assembly stays within its configured bounds
//! - URL extraction never panics
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// RECENCY SCORING
// ============================================================================

mod recency_tests {
    use super::*;
    use chrono::{Duration, Utc};
    use retell::recall::recency_score;

    // Age/half-life ratios stay well inside f32 range: 0.5^x underflows to
    // exactly 0.0 near x ≈ 150, which would vacuously break ">" assertions.

    proptest! {
        /// Invariant: recency is always in (0, 1] for non-negative ages
        #[test]
        fn bounded(age_minutes in 0_i64..100_000, half_life in 50.0_f32..1000.0) {
            let now = Utc::now();
            let score = recency_score(now - Duration::minutes(age_minutes), now, half_life);
            prop_assert!(score > 0.0);
            prop_assert!(score <= 1.0);
        }

        /// Invariant: strictly older means strictly lower, at any half-life
        #[test]
        fn strictly_monotonic(
            age_minutes in 0_i64..100_000,
            gap_minutes in 60_i64..100_000,
            half_life in 50.0_f32..500.0,
        ) {
            let now = Utc::now();
            let newer = recency_score(now - Duration::minutes(age_minutes), now, half_life);
            let older = recency_score(
                now - Duration::minutes(age_minutes + gap_minutes),
                now,
                half_life,
            );
            prop_assert!(newer > older, "newer={} older={}", newer, older);
        }

        /// Invariant: one half-life halves the score, at any starting age
        #[test]
        fn half_life_halves(age_hours in 0_i64..100, half_life_hours in 10_u32..100) {
            let now = Utc::now();
            let half_life = half_life_hours as f32;
            let at_age = recency_score(now - Duration::hours(age_hours), now, half_life);
            let one_later = recency_score(
                now - Duration::hours(age_hours + half_life_hours as i64),
                now,
                half_life,
            );
            let ratio = one_later / at_age;
            prop_assert!((ratio - 0.5).abs() < 0.01, "ratio={}", ratio);
        }
    }
}

// ============================================================================
// CANDIDATE RANKING
// ============================================================================

mod ranking_tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use retell::recall::rank_candidates;
    use retell::{MemoryEntry, RecallConfig};

    fn entry(id: &str, created_at: DateTime<Utc>) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            source_text: "s".to_string(),
            translation_text: "t".to_string(),
            embedding: vec![1.0, 0.0],
            reference_url: None,
            created_at,
        }
    }

    proptest! {
        /// Invariant: at equal similarity, the newer entry ranks first for
        /// every positive weight
        #[test]
        fn recency_breaks_similarity_ties(
            similarity in 0.0_f32..=1.0,
            age_gap_hours in 1_i64..1000,
            weight in 0.01_f32..=1.0,
        ) {
            let now = Utc::now();
            let config = RecallConfig { recency_weight: weight, ..Default::default() };
            let raw = vec![
                (entry("old", now - Duration::hours(age_gap_hours)), similarity),
                (entry("new", now), similarity),
            ];

            let ranked = rank_candidates(raw, now, &config);
            prop_assert_eq!(ranked[0].entry.id.as_str(), "new");
        }

        /// Invariant: ranked output is sorted by combined score descending
        #[test]
        fn output_is_sorted(
            sims in prop::collection::vec(0.0_f32..=1.0, 0..20),
        ) {
            let now = Utc::now();
            let raw: Vec<_> = sims
                .iter()
                .enumerate()
                .map(|(i, &s)| (entry(&format!("e{}", i), now - Duration::hours(i as i64)), s))
                .collect();

            let ranked = rank_candidates(raw, now, &RecallConfig::default());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].combined >= pair[1].combined);
            }
        }

        /// Invariant: every component score lands in [0, 1]
        #[test]
        fn scores_stay_in_unit_interval(
            raw_sim in -2.0_f32..2.0,
            age_hours in 0_i64..10_000,
        ) {
            let now = Utc::now();
            let ranked = rank_candidates(
                vec![(entry("e", now - Duration::hours(age_hours)), raw_sim)],
                now,
                &RecallConfig::default(),
            );
            let c = &ranked[0];
            prop_assert!((0.0..=1.0).contains(&c.similarity));
            prop_assert!((0.0..=1.0).contains(&c.recency));
            prop_assert!((0.0..=1.0).contains(&c.combined));
        }
    }
}

// ============================================================================
// CONTEXT ASSEMBLY
// ============================================================================

mod context_tests {
    use super::*;
    use chrono::Utc;
    use retell::{ContextAssembler, ContextConfig, MemoryEntry, RankedCandidate};

    fn candidate(translation: String) -> RankedCandidate {
        RankedCandidate {
            entry: MemoryEntry {
                id: "x".to_string(),
                source_text: "s".to_string(),
                translation_text: translation,
                embedding: vec![0.0; 2],
                reference_url: None,
                created_at: Utc::now(),
            },
            similarity: 0.5,
            recency: 0.5,
            combined: 0.5,
        }
    }

    proptest! {
        /// Invariant: assembly never panics and never exceeds max_entries
        /// lines, for arbitrary (including multibyte) translation text
        #[test]
        fn bounded_lines(
            texts in prop::collection::vec("\\PC{0,300}", 0..30),
            max_entries in 1_usize..15,
            preview in 1_usize..200,
        ) {
            let assembler = ContextAssembler::new(ContextConfig {
                max_entries,
                preview_max_chars: preview,
            });
            let candidates: Vec<_> = texts.into_iter().map(candidate).collect();
            let block = assembler.assemble(&candidates);

            let line_count = if block.text.is_empty() { 0 } else { block.text.lines().count() };
            prop_assert!(line_count <= max_entries);
        }

        /// Invariant: each preview stays within its character budget
        /// (numbering prefix aside)
        #[test]
        fn bounded_previews(text in "\\PC{0,500}", preview in 1_usize..100) {
            let assembler = ContextAssembler::new(ContextConfig {
                max_entries: 1,
                preview_max_chars: preview,
            });
            let block = assembler.assemble(&[candidate(text)]);

            if let Some(line) = block.text.lines().next() {
                // Strip the "1. " prefix before counting
                let body = line.splitn(2, ". ").nth(1).unwrap_or("");
                prop_assert!(body.chars().count() <= preview);
            }
        }
    }
}

// ============================================================================
// EMBEDDING
// ============================================================================

mod embedding_tests {
    use super::*;
    use retell::embedding::{cosine_similarity, Embedder, TfIdfEmbedder};

    proptest! {
        /// Invariant: embedding is deterministic and (when non-zero)
        /// L2-normalized, for arbitrary input
        #[test]
        fn deterministic_and_normalized(s in "\\PC{2,200}") {
            let embedder = TfIdfEmbedder::new(64);
            let a = tokio_test::block_on(embedder.embed(&s));
            let b = tokio_test::block_on(embedder.embed(&s));

            match (a, b) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(&a, &b);
                    let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                    prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 0.01);
                }
                // Blank input must be rejected consistently
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "embed results disagree between calls"),
            }
        }

        /// Invariant: a non-zero embedding has self-similarity 1
        #[test]
        fn self_similarity(s in "[a-z ]{4,100}") {
            let embedder = TfIdfEmbedder::new(64);
            if let Ok(e) = tokio_test::block_on(embedder.embed(&s)) {
                let sim = cosine_similarity(&e, &e);
                prop_assert!(sim == 0.0 || (sim - 1.0).abs() < 0.001);
            }
        }
    }
}

// ============================================================================
// URL EXTRACTION
// ============================================================================

mod url_tests {
    use super::*;
    use retell::generation::extract_urls;

    proptest! {
        /// Invariant: extraction never panics on any input
        #[test]
        fn never_panics(s in "\\PC*") {
            let _ = extract_urls(&s);
        }

        /// Invariant: every extracted URL starts with a scheme and appears
        /// in the input
        #[test]
        fn extracted_urls_come_from_input(s in "\\PC{0,500}") {
            for url in extract_urls(&s) {
                prop_assert!(url.starts_with("http://") || url.starts_with("https://"));
                prop_assert!(s.contains(&url));
            }
        }

        /// Invariant: extraction is duplicate-free
        #[test]
        fn no_duplicates(s in "\\PC{0,500}") {
            let urls = extract_urls(&s);
            let unique: std::collections::HashSet<_> = urls.iter().collect();
            prop_assert_eq!(unique.len(), urls.len());
        }
    }
}
