//! Core data types and the error taxonomy shared across the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A contiguous window of a source document.
///
/// Chunks are produced left to right and `index` preserves that order.
/// Retrieval reorders results by similarity, so display code that wants the
/// original layout sorts by `index` again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position of this chunk in document order.
    pub index: usize,
    /// Byte offset of the window start within the source document.
    pub start: usize,
    /// The window text, including the trailing separator it was cut at.
    pub text: String,
}

impl Chunk {
    /// Window length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset one past the end of the window.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A chunk paired with its similarity score for one query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// A generated answer plus the context chunks that were supplied to the
/// generation call, in the order they were supplied (similarity order).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub context: Vec<ScoredChunk>,
}

/// Pipeline phase in which an embedding call failed.
///
/// An `IndexBuild` failure leaves no usable index behind; a `Query` failure
/// is scoped to the one query and the index stays valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingPhase {
    IndexBuild,
    Query,
}

impl std::fmt::Display for EmbeddingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingPhase::IndexBuild => f.write_str("index build"),
            EmbeddingPhase::Query => f.write_str("query"),
        }
    }
}

/// Failure reported by an external capability (embedding or generation).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The call never produced a response (connect, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {message}")]
    Service { status: u16, message: String },

    /// A response arrived but could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors surfaced by the question-answering pipeline.
///
/// Nothing is retried internally; the caller decides whether a failure is
/// worth retrying, surfacing, or aborting on.
#[derive(Debug, Error)]
pub enum QaError {
    /// A configuration that can never terminate or produce valid windows.
    /// Reported before any chunking or network work starts.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The embedding capability failed. `phase` tells the caller whether the
    /// index is unusable ([`EmbeddingPhase::IndexBuild`]) or still valid
    /// ([`EmbeddingPhase::Query`]).
    #[error("embedding failed during {phase}: {source}")]
    EmbeddingFailure {
        phase: EmbeddingPhase,
        #[source]
        source: ProviderError,
    },

    /// The generation capability failed for this query only.
    #[error("generation failed: {source}")]
    GenerationFailure {
        #[source]
        source: ProviderError,
    },
}

impl QaError {
    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> Self {
        QaError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
