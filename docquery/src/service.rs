//! The end-to-end pipeline: chunk, embed, retrieve, generate.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::chunker;
use crate::config::{ChunkingConfig, SimilarityMetric};
use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::index::ChunkIndex;
use crate::types::{Answer, EmbeddingPhase, ProviderError, QaError};

/// Default instruction given to the generation capability.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a document assistant. Answer the question using \
     only the provided context. If the context does not contain the answer, say that you cannot \
     find it in the document.";

/// Stateless document question-answering pipeline.
///
/// One service can build any number of indexes and answer any number of
/// questions; it holds configuration and the two external capabilities,
/// nothing per-document or per-conversation. Chat history, if the caller
/// keeps any, lives with the caller and is passed in as part of the
/// question text.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use docquery::embeddings::MockEmbeddingProvider;
/// use docquery::generation::MockGenerationProvider;
/// use docquery::service::DocumentQaService;
///
/// let service = DocumentQaService::builder()
///     .with_embedding_provider(Arc::new(MockEmbeddingProvider::new()))
///     .with_generation_provider(Arc::new(MockGenerationProvider::new()))
///     .build();
///
/// let index = service.build_index(&document_text).await?;
/// let answer = service.answer(&index, "What is this about?", 4).await?;
/// println!("{}", answer.text);
/// ```
pub struct DocumentQaService {
    chunking: ChunkingConfig,
    metric: SimilarityMetric,
    system_prompt: String,
    call_timeout: Option<Duration>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
}

impl DocumentQaService {
    /// Create a new builder for constructing a service.
    pub fn builder() -> DocumentQaServiceBuilder {
        DocumentQaServiceBuilder::default()
    }

    pub fn chunking_config(&self) -> &ChunkingConfig {
        &self.chunking
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Splits `document` and embeds every chunk exactly once, in document
    /// order.
    ///
    /// All-or-nothing: if the embedding batch fails, no index is returned
    /// and the error carries [`EmbeddingPhase::IndexBuild`].
    pub async fn build_index(&self, document: &str) -> Result<ChunkIndex, QaError> {
        let started = Instant::now();
        let chunks = chunker::split(document, &self.chunking)?;
        debug!(
            chunks = chunks.len(),
            embedder = self.embedder.name(),
            "document split"
        );

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .call(self.embedder.embed_batch(&texts))
            .await
            .map_err(|source| QaError::EmbeddingFailure {
                phase: EmbeddingPhase::IndexBuild,
                source,
            })?;
        let index = ChunkIndex::from_parts(chunks, embeddings, self.metric).map_err(|source| {
            QaError::EmbeddingFailure {
                phase: EmbeddingPhase::IndexBuild,
                source,
            }
        })?;

        info!(
            index_id = %index.id(),
            chunks = index.len(),
            dimension = index.dimension(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );
        Ok(index)
    }

    /// Answers `question` from the `k` most similar chunks of `index`.
    ///
    /// Retrieved chunks are forwarded to the generator in similarity order
    /// and the generated text comes back verbatim. A failure here leaves
    /// `index` fully usable for later calls; nothing is retried.
    pub async fn answer(
        &self,
        index: &ChunkIndex,
        question: &str,
        k: usize,
    ) -> Result<Answer, QaError> {
        if k == 0 {
            return Err(QaError::invalid_configuration("k must be at least 1"));
        }
        let started = Instant::now();
        let query = self
            .call(self.embedder.embed(question))
            .await
            .map_err(|source| QaError::EmbeddingFailure {
                phase: EmbeddingPhase::Query,
                source,
            })?;
        let context = index
            .search(&query, k)
            .map_err(|source| QaError::EmbeddingFailure {
                phase: EmbeddingPhase::Query,
                source,
            })?;
        debug!(index_id = %index.id(), retrieved = context.len(), k, "context retrieved");

        let texts: Vec<String> = context
            .iter()
            .map(|scored| scored.chunk.text.clone())
            .collect();
        let text = self
            .call(self.generator.generate(&self.system_prompt, &texts, question))
            .await
            .map_err(|source| QaError::GenerationFailure { source })?;

        info!(
            index_id = %index.id(),
            context_chunks = context.len(),
            generator = self.generator.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answer generated"
        );
        Ok(Answer { text, context })
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                Err(ProviderError::Transport(format!(
                    "call exceeded timeout of {limit:?}"
                )))
            }),
            None => fut.await,
        }
    }
}

/// Builder for [`DocumentQaService`] instances.
#[derive(Default)]
pub struct DocumentQaServiceBuilder {
    chunking: Option<ChunkingConfig>,
    metric: Option<SimilarityMetric>,
    system_prompt: Option<String>,
    call_timeout: Option<Duration>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn GenerationProvider>>,
}

impl DocumentQaServiceBuilder {
    /// Set the chunking configuration.
    ///
    /// Defaults to [`ChunkingConfig::default`].
    #[must_use]
    pub fn with_chunking_config(mut self, config: ChunkingConfig) -> Self {
        self.chunking = Some(config);
        self
    }

    /// Set the similarity metric used by indexes this service builds.
    ///
    /// Defaults to cosine.
    #[must_use]
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Set the system prompt forwarded to the generator.
    ///
    /// Defaults to [`DEFAULT_SYSTEM_PROMPT`].
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Upper bound applied to each external call. The external calls are
    /// network-bound, so callers serving interactive traffic usually want
    /// one; there is no timeout by default.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the embedding capability.
    ///
    /// This is required before calling [`build()`](Self::build).
    #[must_use]
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Set the generation capability.
    ///
    /// This is required before calling [`build()`](Self::build).
    #[must_use]
    pub fn with_generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(provider);
        self
    }

    /// Use one [`OpenAiClient`](crate::openai::OpenAiClient) for both
    /// capabilities.
    #[must_use]
    pub fn with_openai(self, client: crate::openai::OpenAiClient) -> Self {
        let shared = Arc::new(client);
        self.with_embedding_provider(shared.clone())
            .with_generation_provider(shared)
    }

    /// Build the service.
    ///
    /// # Panics
    ///
    /// Panics if either provider was not supplied.
    pub fn build(self) -> DocumentQaService {
        self.try_build()
            .expect("DocumentQaServiceBuilder requires an embedding and a generation provider")
    }

    /// Build the service, returning `None` if a provider is missing.
    pub fn try_build(self) -> Option<DocumentQaService> {
        Some(DocumentQaService {
            chunking: self.chunking.unwrap_or_default(),
            metric: self.metric.unwrap_or_default(),
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            call_timeout: self.call_timeout,
            embedder: self.embedder?,
            generator: self.generator?,
        })
    }
}
