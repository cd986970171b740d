use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{FieldConfig, MatcherConfig};
use crate::embedding::Embedder;
use crate::matchers::{match_exact, match_ner, FieldScore, MatcherKind, SemanticMatcher};
use crate::normalize::normalize_field;
use crate::record::{Field, Record, MAX_NAME_TAG_CHARS};
use crate::retry::RetryPolicy;

/// Which side of a pair a problem was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Predicted,
    Truth,
    Both,
}

impl Side {
    fn from_flags(predicted: bool, truth: bool) -> Option<Self> {
        match (predicted, truth) {
            (true, true) => Some(Side::Both),
            (true, false) => Some(Side::Predicted),
            (false, true) => Some(Side::Truth),
            (false, false) => None,
        }
    }
}

/// How one field of one pair was resolved.
///
/// Every variant other than `Matched` scores zero in aggregates and is
/// counted separately. Both records of a pair always hold a valid address;
/// malformed addresses are caught at load time and flagged in the metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Matched { score: FieldScore },
    Missing { side: Side },
    MatcherUnavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldComparisonResult {
    pub matcher: MatcherKind,
    #[serde(flatten)]
    pub outcome: FieldOutcome,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
}

/// Field results for one matched (predicted, truth) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordScore {
    pub key: String,
    pub fields: BTreeMap<Field, FieldComparisonResult>,
    /// Formatting rules the raw prediction breaks, independent of matching.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formatting_errors: Vec<String>,
}

impl RecordScore {
    pub fn get(&self, field: Field) -> Option<&FieldComparisonResult> {
        self.fields.get(&field)
    }

    pub fn has_unavailable_matcher(&self) -> bool {
        self.fields
            .values()
            .any(|result| matches!(result.outcome, FieldOutcome::MatcherUnavailable { .. }))
    }
}

/// Applies the configured matcher to every field of a record pair.
pub struct RecordScorer<'a> {
    fields: &'a FieldConfig,
    semantic: SemanticMatcher<'a>,
}

impl<'a> RecordScorer<'a> {
    pub fn new(fields: &'a FieldConfig, embedder: &'a dyn Embedder, retry: RetryPolicy) -> Self {
        Self {
            fields,
            semantic: SemanticMatcher::new(embedder, retry),
        }
    }

    pub fn score_record(&self, predicted: &Record, truth: &Record) -> RecordScore {
        let fields = self
            .fields
            .iter()
            .map(|(field, matcher)| {
                let result =
                    self.score_field(field, matcher, predicted.get(field), truth.get(field));
                (field, result)
            })
            .collect();
        RecordScore {
            key: truth.key().to_string(),
            fields,
            formatting_errors: formatting_errors(predicted),
        }
    }

    fn score_field(
        &self,
        field: Field,
        matcher: &MatcherConfig,
        predicted: Option<&str>,
        truth: Option<&str>,
    ) -> FieldComparisonResult {
        let kind = matcher.kind();
        let ground_truth = truth.map(|value| normalize_field(field, value));
        let prediction = predicted.map(|value| normalize_field(field, value));

        let (Some(predicted_value), Some(truth_value)) = (&prediction, &ground_truth) else {
            let side = Side::from_flags(prediction.is_none(), ground_truth.is_none())
                .unwrap_or(Side::Both);
            tracing::debug!(field = field.name(), ?side, "field missing");
            return unscored(kind, FieldOutcome::Missing { side }, ground_truth, prediction);
        };

        let (score, passed) = match *matcher {
            MatcherConfig::Exact => {
                let score = match_exact(predicted_value, truth_value);
                (FieldScore::Exact(score), score.is_exact)
            }
            MatcherConfig::Ner { tolerance, min_f1 } => {
                let score = match_ner(predicted_value, truth_value, tolerance);
                (FieldScore::Ner(score), score.f1 >= min_f1)
            }
            MatcherConfig::Semantic { threshold } => {
                match self.semantic.compare(predicted_value, truth_value, threshold) {
                    Ok(score) => (FieldScore::Semantic(score), score.passed),
                    Err(err) => {
                        tracing::warn!(
                            field = field.name(),
                            embedder = self.semantic.embedder_name(),
                            error = %err,
                            "semantic matcher unavailable"
                        );
                        let outcome = FieldOutcome::MatcherUnavailable {
                            reason: err.to_string(),
                        };
                        return unscored(kind, outcome, ground_truth, prediction);
                    }
                }
            }
        };

        FieldComparisonResult {
            matcher: kind,
            outcome: FieldOutcome::Matched { score },
            passed,
            ground_truth,
            prediction,
        }
    }
}

fn formatting_errors(predicted: &Record) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(tag) = predicted.get(Field::PublicNameTag) {
        if tag.trim().chars().count() > MAX_NAME_TAG_CHARS {
            errors.push(format!(
                "{} exceeds {MAX_NAME_TAG_CHARS} characters",
                Field::PublicNameTag
            ));
        }
    }
    errors
}

fn unscored(
    matcher: MatcherKind,
    outcome: FieldOutcome,
    ground_truth: Option<String>,
    prediction: Option<String>,
) -> FieldComparisonResult {
    FieldComparisonResult {
        matcher,
        outcome,
        passed: false,
        ground_truth,
        prediction,
    }
}
