//! Scores machine-generated contract tags against a curated ground truth.
//!
//! Records are joined by CAIP-10 contract address; each configured field is
//! compared with an exact, entity-style (NER) or semantic matcher, and the
//! per-record results are folded into dataset-level metrics.

pub mod config;
pub mod embedded;
pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod matchers;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod report;
pub mod retry;
pub mod scorer;
pub mod template;

pub use config::{EvalConfig, FieldConfig, MatcherConfig};
pub use error::{EmbeddingError, EvaluationError};
pub use evaluator::{evaluate, load_collection, parse_collection, Evaluation};
pub use metrics::DatasetMetrics;
pub use record::{ContractAddress, Field, Record, RecordCollection, RecordLine};
pub use scorer::{FieldComparisonResult, FieldOutcome, RecordScore, RecordScorer};
