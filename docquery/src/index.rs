//! In-memory vector index over document chunks.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::SimilarityMetric;
use crate::types::{Chunk, ProviderError, ScoredChunk};

/// Read-only collection of chunk/embedding pairs supporting top-k lookup.
///
/// An index is built once per document and never mutated afterwards, so any
/// number of concurrent readers can share it. Replacing the document means
/// building a fresh index; [`SharedIndex`] handles the hand-over.
#[derive(Clone, Debug)]
pub struct ChunkIndex {
    id: Uuid,
    metric: SimilarityMetric,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Clone, Debug)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
    norm: f32,
}

impl ChunkIndex {
    /// Pairs chunks with their embeddings, checking that every chunk got a
    /// vector and that all vectors share one dimension.
    pub fn from_parts(
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        metric: SimilarityMetric,
    ) -> Result<Self, ProviderError> {
        if embeddings.len() != chunks.len() {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        let dimension = embeddings.first().map(|vector| vector.len()).unwrap_or(0);
        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            if embedding.len() != dimension {
                return Err(ProviderError::MalformedResponse(format!(
                    "embedding dimension mismatch: expected {dimension}, got {} for chunk {}",
                    embedding.len(),
                    chunk.index
                )));
            }
            let norm = l2_norm(&embedding);
            entries.push(IndexEntry {
                chunk,
                embedding,
                norm,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            metric,
            dimension,
            entries,
        })
    }

    /// Identity of this build; a rebuild gets a fresh id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Dimension of the stored vectors (0 for an empty index).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chunks in document order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Returns the `k` chunks most similar to `query`, similarity
    /// descending, ties broken by document order (earlier chunk wins).
    /// Fewer than `k` chunks in the index means all of them come back.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, ProviderError> {
        if !self.entries.is_empty() && query.len() != self.dimension {
            return Err(ProviderError::MalformedResponse(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }
        let query_norm = l2_norm(query);
        let mut scored: Vec<(f32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(at, entry)| (self.score(query, query_norm, entry), at))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(score, at)| ScoredChunk {
                chunk: self.entries[at].chunk.clone(),
                score,
            })
            .collect())
    }

    fn score(&self, query: &[f32], query_norm: f32, entry: &IndexEntry) -> f32 {
        let dot = dot_product(query, &entry.embedding);
        match self.metric {
            SimilarityMetric::DotProduct => dot,
            SimilarityMetric::Cosine => {
                let denom = query_norm * entry.norm;
                // zero-norm vectors have no direction; score them neutral
                if denom == 0.0 { 0.0 } else { dot / denom }
            }
        }
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Shared handle for serving queries across index rebuilds.
///
/// Readers [`load`](SharedIndex::load) an `Arc` and keep using it for the
/// duration of a query; [`swap`](SharedIndex::swap) installs a replacement
/// without touching the index an in-flight query is still holding.
#[derive(Clone, Debug, Default)]
pub struct SharedIndex {
    current: Arc<RwLock<Option<Arc<ChunkIndex>>>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index, if one has been installed.
    pub fn load(&self) -> Option<Arc<ChunkIndex>> {
        self.current.read().clone()
    }

    /// Installs `index` and returns the replaced one, if any.
    pub fn swap(&self, index: ChunkIndex) -> Option<Arc<ChunkIndex>> {
        self.current.write().replace(Arc::new(index))
    }

    /// Removes the current index.
    pub fn clear(&self) -> Option<Arc<ChunkIndex>> {
        self.current.write().take()
    }
}
