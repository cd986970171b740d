use serde::Serialize;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::EmbeddingError;
use crate::retry::RetryPolicy;

pub const DEFAULT_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SemanticScore {
    /// Cosine similarity clamped to [0, 1].
    pub similarity: f64,
    pub passed: bool,
}

/// Embeds both texts once and compares them.
///
/// An empty text on either side has similarity 0 and is never sent to the
/// embedder.
pub fn match_semantic(
    embedder: &dyn Embedder,
    predicted: &str,
    truth: &str,
    threshold: f64,
) -> Result<SemanticScore, EmbeddingError> {
    let similarity = if predicted.trim().is_empty() || truth.trim().is_empty() {
        0.0
    } else {
        let predicted_vector = embed_checked(embedder, predicted)?;
        let truth_vector = embed_checked(embedder, truth)?;
        cosine_similarity(&predicted_vector, &truth_vector).clamp(0.0, 1.0)
    };
    Ok(SemanticScore {
        similarity,
        passed: similarity >= threshold,
    })
}

fn embed_checked(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let vector = embedder.embed(text)?;
    if vector.len() != embedder.dimensions() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: embedder.dimensions(),
            actual: vector.len(),
        });
    }
    Ok(vector)
}

/// [`match_semantic`] behind the retry policy for the embedding backend.
#[derive(Clone, Copy)]
pub struct SemanticMatcher<'a> {
    embedder: &'a dyn Embedder,
    retry: RetryPolicy,
}

impl<'a> SemanticMatcher<'a> {
    pub fn new(embedder: &'a dyn Embedder, retry: RetryPolicy) -> Self {
        Self { embedder, retry }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub fn compare(
        &self,
        predicted: &str,
        truth: &str,
        threshold: f64,
    ) -> Result<SemanticScore, EmbeddingError> {
        self.retry.run("semantic embedding", || {
            match_semantic(self.embedder, predicted, truth, threshold)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyEmbedder {
        failures_left: AtomicU32,
        inner: HashingEmbedder,
    }

    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(EmbeddingError::Unavailable("connection reset".into()));
            }
            self.inner.embed(text)
        }
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0; 4])
        }
    }

    #[test]
    fn identical_text_is_fully_similar() {
        let embedder = HashingEmbedder::default();
        let text = "aggregates liquidity for token swaps";
        let score = match_semantic(&embedder, text, text, DEFAULT_THRESHOLD).unwrap();
        assert!((score.similarity - 1.0).abs() < 1e-9);
        assert!(score.passed);
    }

    #[test]
    fn unrelated_text_fails_threshold() {
        let embedder = HashingEmbedder::default();
        let score = match_semantic(
            &embedder,
            "staking deposit contract",
            "nft marketplace exchange",
            DEFAULT_THRESHOLD,
        )
        .unwrap();
        assert!(score.similarity < DEFAULT_THRESHOLD);
        assert!(!score.passed);
    }

    #[test]
    fn empty_input_has_zero_similarity() {
        let embedder = HashingEmbedder::default();
        let score = match_semantic(&embedder, "", "router", DEFAULT_THRESHOLD).unwrap();
        assert_eq!(score.similarity, 0.0);
        let score = match_semantic(&embedder, "", "", DEFAULT_THRESHOLD).unwrap();
        assert_eq!(score.similarity, 0.0);
        assert!(!score.passed);
    }

    #[test]
    fn threshold_is_supplied_by_caller() {
        let embedder = HashingEmbedder::default();
        let score = match_semantic(&embedder, "swap router", "swap pool", 0.4).unwrap();
        assert!((score.similarity - 0.5).abs() < 1e-9);
        assert!(score.passed);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let err = match_semantic(&ShortEmbedder, "a", "b", DEFAULT_THRESHOLD).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 8,
                actual: 4,
            }
        ));
    }

    #[test]
    fn matcher_retries_transient_failures() {
        let embedder = FlakyEmbedder {
            failures_left: AtomicU32::new(2),
            inner: HashingEmbedder::default(),
        };
        let matcher = SemanticMatcher::new(&embedder, RetryPolicy::immediate(3));
        let score = matcher.compare("vault", "vault", DEFAULT_THRESHOLD).unwrap();
        assert!(score.passed);

        let embedder = FlakyEmbedder {
            failures_left: AtomicU32::new(10),
            inner: HashingEmbedder::default(),
        };
        let matcher = SemanticMatcher::new(&embedder, RetryPolicy::immediate(3));
        assert!(matcher.compare("vault", "vault", DEFAULT_THRESHOLD).is_err());
    }
}
