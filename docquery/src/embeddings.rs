//! Embedding capability boundary.
//!
//! The pipeline never implements an embedding model itself; it calls
//! whatever [`EmbeddingProvider`] the caller wires in. Implementations must
//! return one vector per input, in input order, all of the same dimension.

use async_trait::async_trait;

use crate::types::ProviderError;

/// External capability that turns text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed_batch(&batch).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            got => Err(ProviderError::MalformedResponse(format!(
                "expected 1 vector, got {got}"
            ))),
        }
    }

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Deterministic, network-free embedding provider for tests and examples.
///
/// Vectors are derived from a hash of the input text: identical text always
/// maps to the identical vector and distinct text almost always differs.
/// The geometry carries no meaning, which is exactly what structural tests
/// want.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub const DEFAULT_DIMENSION: usize = 16;

    pub fn new() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        (0..self.dimension)
            .map(|lane| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                lane.hash(&mut hasher);
                // fold the 64-bit hash into [-1.0, 1.0]
                (hasher.finish() as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second, "same inputs must produce same vectors");
        assert_eq!(first[0], first[2], "identical text, identical vector");
        assert_ne!(first[0], first[1], "distinct text, distinct vector");
    }

    #[tokio::test]
    async fn mock_respects_the_configured_dimension() {
        let provider = MockEmbeddingProvider::with_dimension(4);
        let vector = provider.embed("anything").await.unwrap();
        assert_eq!(vector.len(), 4);
    }

    #[tokio::test]
    async fn single_embed_matches_its_batch_entry() {
        let provider = MockEmbeddingProvider::new();
        let single = provider.embed("some text").await.unwrap();
        let batch = provider
            .embed_batch(&["some text".to_string()])
            .await
            .unwrap();
        assert_eq!(single, batch[0]);
    }
}
