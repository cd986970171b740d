use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::FieldConfig;
use crate::matchers::{FieldScore, MatcherKind};
use crate::record::{Field, RecordCollection};
use crate::scorer::{FieldOutcome, RecordScore};

/// Record bookkeeping for one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub ground_truth_records: usize,
    pub predicted_records: usize,
    pub matched_pairs: usize,
    pub unmatched_ground_truth: usize,
    pub unmatched_predictions: usize,
    /// Matched pairs where every field was scored by its matcher.
    pub scored_records: usize,
    /// Matched pairs with at least one field whose matcher was unavailable.
    pub matcher_unavailable_records: usize,
    /// Input lines skipped because they could not be read as records.
    pub skipped_ground_truth_lines: usize,
    pub skipped_prediction_lines: usize,
    /// Skipped lines whose `Contract Address` is not valid CAIP-10.
    pub malformed_ground_truth_addresses: usize,
    pub malformed_prediction_addresses: usize,
    /// Matched predictions breaking a formatting rule.
    pub formatting_violations: usize,
}

/// Load-time sizes of one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub records: usize,
    pub skipped_lines: usize,
    pub malformed_addresses: usize,
}

impl CollectionCounts {
    pub fn of(collection: &RecordCollection) -> Self {
        Self {
            records: collection.len(),
            skipped_lines: collection.errors().len(),
            malformed_addresses: collection.malformed_addresses().count(),
        }
    }
}

/// Matcher-specific aggregate for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldSummary {
    Exact {
        exact_match_rate: f64,
    },
    Ner {
        precision: f64,
        recall: f64,
        f1: f64,
        exact_match_rate: f64,
    },
    Semantic {
        mean_similarity: f64,
        pass_rate: f64,
    },
}

/// Aggregate for one field.
///
/// `summary` and `pass_rate` are taken over every evaluated ground-truth
/// record, so unmatched ground truth counts as a zero score. `matched` covers
/// matched pairs only and is absent when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetrics {
    pub matcher: MatcherKind,
    pub evaluated: usize,
    pub pass_rate: f64,
    pub summary: FieldSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<FieldSummary>,
    pub missing: usize,
    /// Ground-truth records whose prediction was rejected for a malformed
    /// address. Only `contract_address` carries this flag.
    pub malformed: usize,
    pub matcher_unavailable: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetMetrics {
    pub counts: RecordCounts,
    /// Mean of the per-field pass rates.
    pub overall_accuracy: f64,
    pub fields: BTreeMap<Field, FieldMetrics>,
    pub unmatched_ground_truth_keys: Vec<String>,
    pub unmatched_prediction_keys: Vec<String>,
    /// Unmatched ground-truth keys whose prediction had a malformed address.
    pub malformed_prediction_keys: Vec<String>,
}

impl DatasetMetrics {
    pub fn field(&self, field: Field) -> Option<&FieldMetrics> {
        self.fields.get(&field)
    }
}

#[derive(Debug, Clone, Default)]
struct FieldAccumulator {
    scored: usize,
    unmatched: usize,
    passes: usize,
    exact_hits: usize,
    precision_sum: f64,
    recall_sum: f64,
    f1_sum: f64,
    similarity_sum: f64,
    missing: usize,
    malformed: usize,
    unavailable: usize,
}

impl FieldAccumulator {
    fn add(&mut self, passed: bool, outcome: &FieldOutcome) {
        self.scored += 1;
        if passed {
            self.passes += 1;
        }
        match outcome {
            FieldOutcome::Matched { score } => match score {
                FieldScore::Exact(exact) => self.exact_hits += usize::from(exact.is_exact),
                FieldScore::Ner(ner) => {
                    self.exact_hits += usize::from(ner.exact);
                    self.precision_sum += ner.precision;
                    self.recall_sum += ner.recall;
                    self.f1_sum += ner.f1;
                }
                FieldScore::Semantic(semantic) => self.similarity_sum += semantic.similarity,
            },
            FieldOutcome::Missing { .. } => self.missing += 1,
            FieldOutcome::MatcherUnavailable { .. } => self.unavailable += 1,
        }
    }

    fn summarize(&self, matcher: MatcherKind) -> FieldMetrics {
        let evaluated = self.scored + self.unmatched;
        FieldMetrics {
            matcher,
            evaluated,
            pass_rate: round(mean(self.passes as f64, evaluated)),
            summary: self.summary(matcher, evaluated),
            matched: (self.scored > 0).then(|| self.summary(matcher, self.scored)),
            missing: self.missing,
            malformed: self.malformed,
            matcher_unavailable: self.unavailable,
        }
    }

    fn summary(&self, matcher: MatcherKind, denominator: usize) -> FieldSummary {
        let exact_match_rate = round(mean(self.exact_hits as f64, denominator));
        match matcher {
            MatcherKind::Exact => FieldSummary::Exact { exact_match_rate },
            MatcherKind::Ner => FieldSummary::Ner {
                precision: round(mean(self.precision_sum, denominator)),
                recall: round(mean(self.recall_sum, denominator)),
                f1: round(mean(self.f1_sum, denominator)),
                exact_match_rate,
            },
            MatcherKind::Semantic => FieldSummary::Semantic {
                mean_similarity: round(mean(self.similarity_sum, denominator)),
                pass_rate: round(mean(self.passes as f64, denominator)),
            },
        }
    }
}

/// Folds record scores into [`DatasetMetrics`].
///
/// Each record contributes equally to every mean (macro-averaging).
#[derive(Debug, Clone)]
pub struct MetricsBuilder {
    fields: BTreeMap<Field, (MatcherKind, FieldAccumulator)>,
    matched_pairs: usize,
    unavailable_records: usize,
    formatting_violations: usize,
    unmatched_ground_truth: Vec<String>,
    malformed_predictions: Vec<String>,
}

impl MetricsBuilder {
    pub fn new(config: &FieldConfig) -> Self {
        let fields = config
            .iter()
            .map(|(field, matcher)| (field, (matcher.kind(), FieldAccumulator::default())))
            .collect();
        Self {
            fields,
            matched_pairs: 0,
            unavailable_records: 0,
            formatting_violations: 0,
            unmatched_ground_truth: Vec::new(),
            malformed_predictions: Vec::new(),
        }
    }

    pub fn add_record(&mut self, score: &RecordScore) {
        self.matched_pairs += 1;
        if score.has_unavailable_matcher() {
            self.unavailable_records += 1;
        }
        if !score.formatting_errors.is_empty() {
            self.formatting_violations += 1;
        }
        for (field, result) in &score.fields {
            if let Some((_, accumulator)) = self.fields.get_mut(field) {
                accumulator.add(result.passed, &result.outcome);
            }
        }
    }

    /// A ground-truth record with no prediction scores zero on every field.
    pub fn add_unmatched(&mut self, key: &str) {
        self.unmatched_ground_truth.push(key.to_string());
        for (_, accumulator) in self.fields.values_mut() {
            accumulator.unmatched += 1;
        }
    }

    /// Like [`add_unmatched`](Self::add_unmatched), for a ground-truth record
    /// whose prediction was rejected for a malformed address.
    pub fn add_malformed_prediction(&mut self, key: &str) {
        self.add_unmatched(key);
        self.malformed_predictions.push(key.to_string());
        if let Some((_, accumulator)) = self.fields.get_mut(&Field::ContractAddress) {
            accumulator.malformed += 1;
        }
    }

    pub fn finish(
        self,
        ground_truth: CollectionCounts,
        predictions: CollectionCounts,
        mut unmatched_prediction_keys: Vec<String>,
    ) -> DatasetMetrics {
        let fields: BTreeMap<Field, FieldMetrics> = self
            .fields
            .iter()
            .map(|(field, (matcher, accumulator))| (*field, accumulator.summarize(*matcher)))
            .collect();

        let pass_rate_sum: f64 = fields.values().map(|metrics| metrics.pass_rate).sum();
        let overall_accuracy = round(mean(pass_rate_sum, fields.len()));

        let mut unmatched_ground_truth_keys = self.unmatched_ground_truth;
        unmatched_ground_truth_keys.sort();
        unmatched_prediction_keys.sort();
        let mut malformed_prediction_keys = self.malformed_predictions;
        malformed_prediction_keys.sort();

        let counts = RecordCounts {
            ground_truth_records: ground_truth.records,
            predicted_records: predictions.records,
            matched_pairs: self.matched_pairs,
            unmatched_ground_truth: unmatched_ground_truth_keys.len(),
            unmatched_predictions: unmatched_prediction_keys.len(),
            scored_records: self.matched_pairs - self.unavailable_records,
            matcher_unavailable_records: self.unavailable_records,
            skipped_ground_truth_lines: ground_truth.skipped_lines,
            skipped_prediction_lines: predictions.skipped_lines,
            malformed_ground_truth_addresses: ground_truth.malformed_addresses,
            malformed_prediction_addresses: predictions.malformed_addresses,
            formatting_violations: self.formatting_violations,
        };

        DatasetMetrics {
            counts,
            overall_accuracy,
            fields,
            unmatched_ground_truth_keys,
            unmatched_prediction_keys,
            malformed_prediction_keys,
        }
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn round(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
