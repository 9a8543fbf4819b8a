//! Configuration for chunking and retrieval.

use serde::{Deserialize, Serialize};

use crate::types::QaError;

/// Controls how a document is split into overlapping windows.
///
/// The defaults mirror the tuning this pipeline shipped with; nothing
/// downstream assumes the exact numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound on window length, in characters.
    pub max_chunk_size: usize,
    /// Characters of the previous window re-read at the start of the next.
    pub overlap: usize,
    /// Separators tried in priority order when trimming a window back to a
    /// natural breakpoint. Later entries are only consulted when no earlier
    /// one occurs inside the window.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 400,
            overlap: 150,
            separators: vec!["\n".to_string()],
        }
    }
}

impl ChunkingConfig {
    /// Rejects configurations that would make the splitter loop forever or
    /// emit empty windows. Called before any splitting work starts.
    pub fn validate(&self) -> Result<(), QaError> {
        if self.max_chunk_size == 0 {
            return Err(QaError::invalid_configuration(
                "max_chunk_size must be greater than zero",
            ));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(QaError::invalid_configuration(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        if self.separators.iter().any(|separator| separator.is_empty()) {
            return Err(QaError::invalid_configuration(
                "separators must be non-empty strings",
            ));
        }
        Ok(())
    }
}

/// Vector comparison used for nearest-neighbor lookup.
///
/// The metric is fixed when an index is built and never mixed across calls
/// against that index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    DotProduct,
}
