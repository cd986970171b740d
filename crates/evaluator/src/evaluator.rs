use rayon::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::EvalConfig;
use crate::embedding::Embedder;
use crate::error::EvaluationError;
use crate::metrics::{CollectionCounts, DatasetMetrics, MetricsBuilder};
use crate::record::{Field, InputError, InputErrorKind, Record, RecordCollection};
use crate::scorer::{RecordScore, RecordScorer};

pub const GROUND_TRUTH: &str = "ground truth";
pub const PREDICTIONS: &str = "predictions";

/// Result of scoring one prediction collection against ground truth.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: DatasetMetrics,
    /// Per-pair results in ground-truth order.
    pub records: Vec<RecordScore>,
}

pub fn load_collection(path: &Path, name: &str) -> Result<RecordCollection, EvaluationError> {
    if !path.exists() {
        return Err(EvaluationError::FileNotFound(path.to_path_buf()));
    }
    let payload = fs::read_to_string(path)?;
    let collection = parse_collection(&payload, name)?;
    tracing::info!(
        collection = name,
        path = %path.display(),
        records = collection.len(),
        skipped = collection.errors().len(),
        "loaded records"
    );
    Ok(collection)
}

/// Parses JSON Lines. Blank lines are ignored; bad lines are collected as
/// [`InputError`]s. Duplicate keys fail the whole collection.
pub fn parse_collection(payload: &str, name: &str) -> Result<RecordCollection, EvaluationError> {
    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (idx, line) in payload.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(idx + 1, line) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(collection = name, %err, "skipping input line");
                errors.push(err);
            }
        }
    }
    if records.is_empty() && !errors.is_empty() {
        return Err(EvaluationError::NoValidRecords {
            collection: name.to_string(),
            errors: errors.len(),
        });
    }
    RecordCollection::new(name, records, errors)
}

fn parse_record(line_no: usize, line: &str) -> Result<Record, InputError> {
    let value: Value = serde_json::from_str(line).map_err(|err| {
        InputError::new(
            line_no,
            InputErrorKind::InvalidJson,
            None,
            format!("invalid JSON: {err}"),
        )
    })?;
    let Value::Object(map) = value else {
        return Err(InputError::new(
            line_no,
            InputErrorKind::NotAnObject,
            None,
            "expected a JSON object",
        ));
    };

    let key = map
        .get(Field::ContractAddress.json_key())
        .and_then(Value::as_str)
        .map(str::to_string);
    let mut values = BTreeMap::new();
    for (name, value) in map {
        let Some(field) = Field::from_json_key(&name) else {
            tracing::debug!(line = line_no, key = %name, "ignoring unknown key");
            continue;
        };
        match value {
            Value::String(text) => {
                values.insert(field, text);
            }
            Value::Null => {}
            other => {
                return Err(InputError::new(
                    line_no,
                    InputErrorKind::InvalidValue,
                    key,
                    format!("'{name}' must be a string, found {other}"),
                ));
            }
        }
    }
    Record::new(line_no, values)
}

/// Lower-cased last segments of the prediction addresses rejected as
/// malformed, e.g. `0xbbb` for a bare `0xBBB`.
fn malformed_address_segments(predictions: &RecordCollection) -> HashSet<String> {
    predictions
        .malformed_addresses()
        .filter_map(|raw| raw.rsplit(':').next())
        .map(|segment| segment.trim().to_ascii_lowercase())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Joins predictions to ground truth by key, scores every matched pair and
/// aggregates the results.
///
/// Pairs are scored in parallel. Aggregation folds them in key order so the
/// metrics do not depend on the order of either input.
///
/// A ground-truth record left without a prediction is flagged as malformed
/// on `contract_address` when a rejected prediction line carried its address
/// segment in a malformed CAIP-10 string. It still scores zero.
pub fn evaluate(
    ground_truth: &RecordCollection,
    predictions: &RecordCollection,
    config: &EvalConfig,
    embedder: &dyn Embedder,
) -> Result<Evaluation, EvaluationError> {
    if ground_truth.is_empty() {
        return Err(EvaluationError::EmptyGroundTruth);
    }

    let mut matched: Vec<(&Record, &Record)> = Vec::new();
    let mut missing: Vec<&Record> = Vec::new();
    for truth in ground_truth.iter() {
        match predictions.get(truth.key()) {
            Some(predicted) => matched.push((predicted, truth)),
            None => missing.push(truth),
        }
    }
    let extra: Vec<String> = predictions
        .iter()
        .filter(|record| !ground_truth.contains_key(record.key()))
        .map(|record| record.key().to_string())
        .collect();
    tracing::info!(
        matched = matched.len(),
        missing = missing.len(),
        extra = extra.len(),
        "joined collections"
    );

    let scorer = RecordScorer::new(&config.fields, embedder, config.retry.policy());
    let score_all = || -> Vec<RecordScore> {
        matched
            .par_iter()
            .map(|(predicted, truth)| scorer.score_record(predicted, truth))
            .collect()
    };
    let records = match config.workers {
        Some(workers) => rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|err| EvaluationError::InvalidConfig(err.to_string()))?
            .install(score_all),
        None => score_all(),
    };

    let mut builder = MetricsBuilder::new(&config.fields);
    let mut order: Vec<&RecordScore> = records.iter().collect();
    order.sort_by(|a, b| a.key.cmp(&b.key));
    for score in order {
        builder.add_record(score);
    }
    let malformed = malformed_address_segments(predictions);
    for truth in missing {
        let segment = truth.address().address().to_ascii_lowercase();
        if malformed.contains(segment.as_str()) {
            builder.add_malformed_prediction(truth.key());
        } else {
            builder.add_unmatched(truth.key());
        }
    }

    let metrics = builder.finish(
        CollectionCounts::of(ground_truth),
        CollectionCounts::of(predictions),
        extra,
    );
    tracing::info!(
        scored = metrics.counts.scored_records,
        overall_accuracy = metrics.overall_accuracy,
        "evaluation complete"
    );
    Ok(Evaluation { metrics, records })
}
