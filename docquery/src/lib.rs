//! ```text
//! Document text ──► chunker::split ──► Vec<Chunk>
//!                                        │
//!                      embeddings::EmbeddingProvider (one batch)
//!                                        │
//!                                        ▼
//!                              index::ChunkIndex ◄──── index::SharedIndex
//!                                        │        (atomic swap on rebuild)
//! Question ──► embed ──► ChunkIndex::search ──► top-k ScoredChunk
//!                                        │
//!                 generation::GenerationProvider ──► types::Answer
//! ```
//!
//! The two provider traits are the only seams that touch the network; the
//! rest of the pipeline is pure apart from awaiting them.
//! [`service::DocumentQaService`] wires the stages together and owns the
//! phase reporting of the error taxonomy in [`types`].

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod openai;
pub mod service;
pub mod types;

pub use config::{ChunkingConfig, SimilarityMetric};
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider};
pub use generation::{GenerationProvider, MockGenerationProvider};
pub use index::{ChunkIndex, SharedIndex};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use service::{DEFAULT_SYSTEM_PROMPT, DocumentQaService, DocumentQaServiceBuilder};
pub use types::{Answer, Chunk, EmbeddingPhase, ProviderError, QaError, ScoredChunk};
