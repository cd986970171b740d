//! Property-based tests for the matchers and dataset aggregation.

use contract_tag_eval::embedding::HashingEmbedder;
use contract_tag_eval::evaluator::{GROUND_TRUTH, PREDICTIONS};
use contract_tag_eval::matchers::{match_exact, match_ner, match_semantic, DEFAULT_TOLERANCE};
use contract_tag_eval::metrics::FieldSummary;
use contract_tag_eval::normalize::{normalize_field, normalize_text};
use contract_tag_eval::{evaluate, parse_collection, EvalConfig, Field};
use proptest::prelude::*;
use serde_json::json;

fn record_line(index: usize, name: &str, tag: &str, note: &str) -> String {
    json!({
        "Contract Address": format!("eip155:1:0x{index:04x}"),
        "Project Name": name,
        "Public Name Tag": tag,
        "UI/Website Link": format!("https://{name}.example"),
        "Public Note": note,
    })
    .to_string()
}

fn words() -> impl Strategy<Value = String> {
    "[a-z]{1,8}( [a-z]{1,8}){0,5}"
}

proptest! {

    /// A value always matches itself once both sides are normalized.
    #[test]
    fn exact_match_is_reflexive(raw in "[ -~]{0,40}") {
        for field in Field::ALL {
            let value = normalize_field(field, &raw);
            prop_assert!(match_exact(&value, &value).is_exact);
        }
    }

    #[test]
    fn text_normalization_is_idempotent(raw in "[ -~]{0,40}") {
        let once = normalize_text(&raw);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn ner_scores_stay_in_unit_interval(
        predicted in "[a-z0-9 :]{0,30}",
        truth in "[a-z0-9 :]{0,30}",
        tolerance in 0.0f64..=1.0,
    ) {
        let score = match_ner(&predicted, &truth, tolerance);
        for value in [score.precision, score.recall, score.f1] {
            prop_assert!((0.0..=1.0).contains(&value), "{score:?}");
        }
        // F1 is zero exactly when nothing paired.
        prop_assert_eq!(score.f1 == 0.0, score.precision == 0.0 && score.recall == 0.0);
    }

    #[test]
    fn ner_identical_values_score_one(value in "[a-z0-9 :]{0,30}") {
        let score = match_ner(&value, &value, DEFAULT_TOLERANCE);
        prop_assert_eq!(score.f1, 1.0);
        prop_assert!(score.exact);
    }

    #[test]
    fn semantic_identical_text_is_similar(text in words()) {
        let embedder = HashingEmbedder::default();
        let score = match_semantic(&embedder, &text, &text, 0.85).unwrap();
        prop_assert!(score.similarity > 1.0 - 1e-9, "{}", score.similarity);
        prop_assert!(score.passed);
    }

    #[test]
    fn semantic_similarity_is_clamped(predicted in "[ -~]{0,40}", truth in "[ -~]{0,40}") {
        let embedder = HashingEmbedder::default();
        let score = match_semantic(&embedder, &predicted, &truth, 0.85).unwrap();
        prop_assert!((0.0..=1.0).contains(&score.similarity));
    }

    /// Dataset metrics depend on the joined pairs, not on line order.
    #[test]
    fn metrics_ignore_prediction_order(
        rows in prop::collection::vec((words(), words(), words(), any::<bool>()), 1..8),
        seed in any::<u64>(),
    ) {
        let truth: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(index, (name, tag, note, _))| record_line(index, name, tag, note))
            .collect();
        let predicted: Vec<String> = rows
            .iter()
            .enumerate()
            .filter(|(_, (_, _, _, keep))| *keep)
            .map(|(index, (name, tag, note, _))| {
                record_line(index, &name.to_uppercase(), note, tag)
            })
            .collect();
        let mut shuffled = predicted.clone();
        let len = shuffled.len().max(1);
        shuffled.rotate_left(seed as usize % len);
        shuffled.reverse();

        let config = EvalConfig::default();
        let embedder = HashingEmbedder::default();
        let ground_truth = parse_collection(&truth.join("\n"), GROUND_TRUTH).unwrap();
        let forward = parse_collection(&predicted.join("\n"), PREDICTIONS).unwrap();
        let backward = parse_collection(&shuffled.join("\n"), PREDICTIONS).unwrap();

        let a = evaluate(&ground_truth, &forward, &config, &embedder).unwrap().metrics;
        let b = evaluate(&ground_truth, &backward, &config, &embedder).unwrap().metrics;
        prop_assert_eq!(&a, &b);

        prop_assert!((0.0..=1.0).contains(&a.overall_accuracy));
        for metrics in a.fields.values() {
            prop_assert!((0.0..=1.0).contains(&metrics.pass_rate));
            if let FieldSummary::Exact { exact_match_rate } = metrics.summary {
                prop_assert!((0.0..=1.0).contains(&exact_match_rate));
            }
        }
    }
}
