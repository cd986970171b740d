//! Field comparison strategies.
//!
//! Each matcher turns an already-normalized `(predicted, truth)` pair into a
//! strategy-specific score. Deciding which matcher applies to which field is
//! the record scorer's job.

mod exact;
mod ner;
mod semantic;

use serde::{Deserialize, Serialize};

pub use exact::{match_exact, ExactScore};
pub use ner::{match_ner, tokenize, NerScore, DEFAULT_TOLERANCE};
pub use semantic::{match_semantic, SemanticMatcher, SemanticScore, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    Exact,
    Ner,
    Semantic,
}

/// Score produced by whichever matcher ran.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldScore {
    Exact(ExactScore),
    Ner(NerScore),
    Semantic(SemanticScore),
}
