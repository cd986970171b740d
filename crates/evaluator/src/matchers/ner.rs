//! Entity-style matching for short name and tag fields.
//!
//! Both values are split into candidate entity strings (word tokens plus the
//! whole value) and paired greedily by normalized Levenshtein similarity.
//! Greedy pairing is not a maximum-weight bipartite matching, so on ambiguous
//! token sets the reported F1 can be lower than the optimum.

use serde::Serialize;

/// Minimum normalized Levenshtein similarity for two tokens to pair up.
/// 0.8 allows an edit distance of up to 20% of the longer token.
pub const DEFAULT_TOLERANCE: f64 = 0.8;

// Edit-distance ratios like 1 - 1/5 are not exact in binary.
const SIMILARITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NerScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// The two values were identical.
    pub exact: bool,
}

impl NerScore {
    fn vacuous() -> Self {
        Self {
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            exact: true,
        }
    }
}

/// Splits on anything that is not alphanumeric. When the value holds more than
/// one token, the whole value is appended as an extra candidate.
pub fn tokenize(value: &str) -> Vec<String> {
    let mut tokens: Vec<String> = value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    let whole = value.trim();
    if !whole.is_empty() && !tokens.iter().any(|token| token == whole) {
        tokens.push(whole.to_string());
    }
    tokens
}

/// Token-level precision, recall and F1 between two normalized values.
///
/// Empty versus empty is a vacuous match (all metrics 1.0). Any other case
/// with an empty side scores 0 for the undefined ratio.
pub fn match_ner(predicted: &str, truth: &str, tolerance: f64) -> NerScore {
    let predicted_tokens = tokenize(predicted);
    let truth_tokens = tokenize(truth);

    if predicted_tokens.is_empty() && truth_tokens.is_empty() {
        return NerScore::vacuous();
    }

    let true_positives = greedy_pairs(&predicted_tokens, &truth_tokens, tolerance).len() as f64;
    let precision = ratio(true_positives, predicted_tokens.len());
    let recall = ratio(true_positives, truth_tokens.len());

    NerScore {
        precision,
        recall,
        f1: f1_score(precision, recall),
        exact: predicted == truth,
    }
}

/// Pairs each truth token with at most one predicted token, best similarity
/// first. Ties go to the earlier truth token, then the earlier prediction.
///
/// Returns `(truth, predicted)` index pairs in the order they were taken.
fn greedy_pairs(predicted: &[String], truth: &[String], tolerance: f64) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for (p, predicted_token) in predicted.iter().enumerate() {
        for (t, truth_token) in truth.iter().enumerate() {
            let similarity = strsim::normalized_levenshtein(predicted_token, truth_token);
            if similarity + SIMILARITY_EPSILON >= tolerance {
                candidates.push((similarity, t, p));
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut predicted_used = vec![false; predicted.len()];
    let mut truth_used = vec![false; truth.len()];
    let mut pairs = Vec::new();
    for (_, t, p) in candidates {
        if predicted_used[p] || truth_used[t] {
            continue;
        }
        predicted_used[p] = true;
        truth_used[t] = true;
        pairs.push((t, p));
    }
    pairs
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

pub(crate) fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn tokenize_adds_whole_value_for_multi_token_fields() {
        assert_eq!(tokenize("uniswap"), vec!["uniswap"]);
        assert_eq!(
            tokenize("uniswap protocol"),
            vec!["uniswap", "protocol", "uniswap protocol"]
        );
        assert_eq!(tokenize("usdc-weth"), vec!["usdc", "weth", "usdc-weth"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn partial_name_overlap() {
        let score = match_ner("uniswap", "uniswap protocol", DEFAULT_TOLERANCE);
        assert!(approx(score.precision, 1.0));
        assert!(approx(score.recall, 1.0 / 3.0));
        assert!(approx(score.f1, 0.5));
        assert!(!score.exact);
    }

    #[test]
    fn near_matches_count_within_tolerance() {
        // one edit over five characters is exactly the 20% budget
        let score = match_ner("aavee", "aave", DEFAULT_TOLERANCE);
        assert!(approx(score.f1, 1.0));

        let score = match_ner("compound", "uniswap", DEFAULT_TOLERANCE);
        assert_eq!(score.f1, 0.0);
        assert_eq!(score.precision, 0.0);
        assert_eq!(score.recall, 0.0);
    }

    #[test]
    fn each_truth_token_is_consumed_once() {
        // both predictions are near "pool", but only one "pool" exists in truth
        let score = match_ner("pool pools", "pool", DEFAULT_TOLERANCE);
        assert!(approx(score.recall, 1.0));
        assert!(approx(score.precision, 1.0 / 3.0));
    }

    #[test]
    fn a_prediction_consumes_at_most_one_truth_token() {
        // "tokens" is within tolerance of both truth tokens
        let pairs = greedy_pairs(
            &["tokens".to_string()],
            &["token".to_string(), "tokens".to_string()],
            DEFAULT_TOLERANCE,
        );
        assert_eq!(pairs, vec![(1, 0)]);
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn equal_similarity_goes_to_the_earlier_truth_token() {
        // one edit over seven characters against either truth token
        let pairs = greedy_pairs(
            &tokens(&["uniswop"]),
            &tokens(&["uniswap", "uniswep"]),
            DEFAULT_TOLERANCE,
        );
        assert_eq!(pairs, vec![(0, 0)]);

        let pairs = greedy_pairs(
            &tokens(&["uniswop", "uniswip"]),
            &tokens(&["uniswap", "uniswep"]),
            DEFAULT_TOLERANCE,
        );
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);

        let score = match_ner("uniswop", "uniswap uniswep", DEFAULT_TOLERANCE);
        assert!(approx(score.precision, 1.0));
        assert!(approx(score.recall, 1.0 / 3.0));
    }

    #[test]
    fn empty_edge_cases() {
        assert_eq!(match_ner("", "", DEFAULT_TOLERANCE), NerScore::vacuous());

        let score = match_ner("uniswap", "", DEFAULT_TOLERANCE);
        assert_eq!((score.precision, score.recall, score.f1), (0.0, 0.0, 0.0));

        let score = match_ner("", "uniswap", DEFAULT_TOLERANCE);
        assert_eq!((score.precision, score.recall, score.f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn identical_values_score_one() {
        for value in ["lido", "lido staked ether", "a a a", "wrapped-ether v2"] {
            let score = match_ner(value, value, DEFAULT_TOLERANCE);
            assert!(approx(score.f1, 1.0), "{value}");
            assert!(score.exact);
        }
    }
}
