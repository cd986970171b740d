use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::EvalConfig;
use crate::embedded;
use crate::error::EvaluationError;
use crate::evaluator::Evaluation;
use crate::metrics::{DatasetMetrics, FieldSummary};
use crate::record::{InputError, RecordCollection};
use crate::scorer::RecordScore;

#[derive(Debug, Serialize)]
pub struct InputErrors<'a> {
    pub ground_truth: &'a [InputError],
    pub predictions: &'a [InputError],
}

/// The document written to the output file.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub build: Value,
    pub embedder: &'a str,
    pub config: &'a EvalConfig,
    pub metrics: &'a DatasetMetrics,
    pub records: &'a [RecordScore],
    pub input_errors: InputErrors<'a>,
}

impl<'a> Report<'a> {
    pub fn new(
        config: &'a EvalConfig,
        embedder: &'a str,
        evaluation: &'a Evaluation,
        ground_truth: &'a RecordCollection,
        predictions: &'a RecordCollection,
    ) -> Self {
        Self {
            build: embedded::build_info(),
            embedder,
            config,
            metrics: &evaluation.metrics,
            records: &evaluation.records,
            input_errors: InputErrors {
                ground_truth: ground_truth.errors(),
                predictions: predictions.errors(),
            },
        }
    }
}

pub fn save_report(path: &Path, report: &Report<'_>) -> Result<(), EvaluationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(report)?;
    fs::write(path, payload + "\n")?;
    Ok(())
}

/// Human-readable summary of the aggregate metrics.
pub fn render_summary(metrics: &DatasetMetrics) -> String {
    let counts = &metrics.counts;
    let mut out = String::from("Evaluation Summary:\n");
    let _ = writeln!(
        out,
        "  Records: {} ground truth, {} predicted, {} matched, {} missing, {} extra",
        counts.ground_truth_records,
        counts.predicted_records,
        counts.matched_pairs,
        counts.unmatched_ground_truth,
        counts.unmatched_predictions
    );
    let _ = writeln!(
        out,
        "  Scored: {}, matcher unavailable: {}, skipped lines: {} ground truth / {} predictions",
        counts.scored_records,
        counts.matcher_unavailable_records,
        counts.skipped_ground_truth_lines,
        counts.skipped_prediction_lines
    );
    if counts.malformed_ground_truth_addresses + counts.malformed_prediction_addresses > 0 {
        let _ = writeln!(
            out,
            "  Malformed addresses: {} ground truth / {} predictions",
            counts.malformed_ground_truth_addresses, counts.malformed_prediction_addresses
        );
    }
    if counts.formatting_violations > 0 {
        let _ = writeln!(out, "  Formatting violations: {}", counts.formatting_violations);
    }
    let _ = writeln!(out, "  Overall accuracy: {:.4}", metrics.overall_accuracy);

    for (field, field_metrics) in &metrics.fields {
        let _ = writeln!(out, "\n{field}:");
        match field_metrics.summary {
            FieldSummary::Exact { exact_match_rate } => {
                let _ = writeln!(out, "  Exact Match Rate: {exact_match_rate:.2}");
            }
            FieldSummary::Ner {
                precision,
                recall,
                f1,
                exact_match_rate,
            } => {
                let _ = writeln!(out, "  F1 Score: {f1:.2}");
                let _ = writeln!(out, "  Precision: {precision:.2}");
                let _ = writeln!(out, "  Recall: {recall:.2}");
                let _ = writeln!(out, "  Exact Match Rate: {exact_match_rate:.2}");
            }
            FieldSummary::Semantic {
                mean_similarity,
                pass_rate,
            } => {
                let _ = writeln!(out, "  Mean Similarity: {mean_similarity:.2}");
                let _ = writeln!(out, "  Semantic Similarity Rate: {pass_rate:.2}");
            }
        }
        let flagged =
            field_metrics.missing + field_metrics.malformed + field_metrics.matcher_unavailable;
        if flagged > 0 {
            let _ = writeln!(
                out,
                "  Flagged: {} missing, {} malformed, {} matcher unavailable",
                field_metrics.missing, field_metrics.malformed, field_metrics.matcher_unavailable
            );
        }
    }
    out
}
