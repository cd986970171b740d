//! Evaluation configuration.
//!
//! Everything has a built-in default, so a run needs no configuration file.
//! A TOML file may override any section; a `[fields]` table replaces the
//! default field table as a whole.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::embedding::HashingEmbedder;
use crate::error::EvaluationError;
use crate::matchers::{MatcherKind, DEFAULT_THRESHOLD, DEFAULT_TOLERANCE};
use crate::record::Field;
use crate::retry::RetryPolicy;

pub const DEFAULT_MIN_F1: f64 = 0.5;

/// Which matcher scores a field, with that matcher's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "matcher", rename_all = "lowercase")]
pub enum MatcherConfig {
    Exact,
    Ner {
        /// Minimum token similarity for a near match.
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        /// Record-level F1 required for the field to pass.
        #[serde(default = "default_min_f1")]
        min_f1: f64,
    },
    Semantic {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_min_f1() -> f64 {
    DEFAULT_MIN_F1
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl MatcherConfig {
    pub fn ner() -> Self {
        Self::Ner {
            tolerance: DEFAULT_TOLERANCE,
            min_f1: DEFAULT_MIN_F1,
        }
    }

    pub fn semantic() -> Self {
        Self::Semantic {
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn kind(&self) -> MatcherKind {
        match self {
            Self::Exact => MatcherKind::Exact,
            Self::Ner { .. } => MatcherKind::Ner,
            Self::Semantic { .. } => MatcherKind::Semantic,
        }
    }

    fn validate(&self, field: Field) -> Result<(), EvaluationError> {
        let checks: Vec<(&str, f64)> = match self {
            Self::Exact => Vec::new(),
            Self::Ner { tolerance, min_f1 } => vec![("tolerance", *tolerance), ("min_f1", *min_f1)],
            Self::Semantic { threshold } => vec![("threshold", *threshold)],
        };
        for (name, value) in checks {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvaluationError::InvalidConfig(format!(
                    "fields.{}.{name} must be within [0, 1], got {value}",
                    field.name()
                )));
            }
        }
        Ok(())
    }
}

/// Per-field matcher assignment.
///
/// Keys may use either the snake_case field name or the JSON key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldConfig(BTreeMap<Field, MatcherConfig>);

impl<'de> Deserialize<'de> for FieldConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, MatcherConfig>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(name, matcher)| {
                Field::from_key(&name)
                    .map(|field| (field, matcher))
                    .ok_or_else(|| de::Error::custom(format!("unknown field '{name}'")))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

impl FieldConfig {
    pub fn get(&self, field: Field) -> Option<&MatcherConfig> {
        self.0.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &MatcherConfig)> {
        self.0.iter().map(|(field, matcher)| (*field, matcher))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Field::ContractAddress, MatcherConfig::Exact),
            (Field::ProjectName, MatcherConfig::ner()),
            (Field::PublicNameTag, MatcherConfig::ner()),
            (Field::UiLink, MatcherConfig::Exact),
            (Field::PublicNote, MatcherConfig::semantic()),
        ]))
    }
}

impl FromIterator<(Field, MatcherConfig)> for FieldConfig {
    fn from_iter<I: IntoIterator<Item = (Field, MatcherConfig)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub ground_truth: PathBuf,
    pub predictions: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ground_truth: PathBuf::from("data/ground-truth/data-set1.jsonl"),
            predictions: PathBuf::from("data/predictions/data-set1.jsonl"),
            output: PathBuf::from("evaluation_results.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: HashingEmbedder::DEFAULT_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub paths: PathsConfig,
    pub embedding: EmbeddingConfig,
    pub retry: RetryConfig,
    /// Scoring threads; `None` uses one per core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    pub fields: FieldConfig,
}

impl EvalConfig {
    pub fn load(path: &Path) -> Result<Self, EvaluationError> {
        if !path.exists() {
            return Err(EvaluationError::FileNotFound(path.to_path_buf()));
        }
        let payload = fs::read_to_string(path)?;
        Self::from_toml_str(&payload)
    }

    pub fn from_toml_str(payload: &str) -> Result<Self, EvaluationError> {
        let config: Self = toml::from_str(payload)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.fields.is_empty() {
            return Err(EvaluationError::InvalidConfig(
                "at least one field must be configured".into(),
            ));
        }
        for (field, matcher) in self.fields.iter() {
            matcher.validate(field)?;
        }
        if self.embedding.dimensions == 0 {
            return Err(EvaluationError::InvalidConfig(
                "embedding.dimensions must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EvaluationError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(EvaluationError::InvalidConfig(
                "retry.initial_backoff_ms cannot exceed retry.max_backoff_ms".into(),
            ));
        }
        if self.workers == Some(0) {
            return Err(EvaluationError::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}
