use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("ground truth collection contains no records")]
    EmptyGroundTruth,
    #[error("{collection} collection has {errors} malformed line(s) and no valid records")]
    NoValidRecords { collection: String, errors: usize },
    #[error("duplicate contract address '{key}' in {collection} collection (lines {first_line} and {line})")]
    DuplicateKey {
        collection: String,
        key: String,
        first_line: usize,
        line: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    InvalidToml(#[from] toml::de::Error),
    #[error("failed to parse JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure reported by an embedding collaborator.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
