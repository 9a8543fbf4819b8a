//! Integration tests for the full pipeline with deterministic providers.
//!
//! A small bag-of-words embedder stands in for the real model so retrieval
//! ordering is meaningful and repeatable, and failing providers exercise
//! each phase of the error taxonomy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use docquery::chunker;
use docquery::config::ChunkingConfig;
use docquery::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
use docquery::generation::{GenerationProvider, MockGenerationProvider};
use docquery::index::SharedIndex;
use docquery::service::DocumentQaService;
use docquery::types::{EmbeddingPhase, ProviderError, QaError};

const VOCABULARY: &[&str] = &[
    "calculus",
    "derivative",
    "integral",
    "war",
    "treaty",
    "empire",
    "ownership",
    "borrow",
    "lifetime",
];

/// Counts vocabulary hits per lane, so texts about the same topic end up
/// close under cosine similarity.
struct BagOfWordsEmbedder;

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lowered = text.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|word| lowered.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

/// Fails every call with a transport error.
struct UnreachableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnreachableEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::Transport("connection refused".into()))
    }
}

/// Succeeds on the first batch (index build), fails afterwards (query).
struct FirstBatchOnlyEmbedder {
    inner: BagOfWordsEmbedder,
    calls: AtomicUsize,
}

impl FirstBatchOnlyEmbedder {
    fn new() -> Self {
        Self {
            inner: BagOfWordsEmbedder,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FirstBatchOnlyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.embed_batch(texts).await
        } else {
            Err(ProviderError::Service {
                status: 503,
                message: "embedding service unavailable".into(),
            })
        }
    }
}

struct RefusingGenerator;

#[async_trait]
impl GenerationProvider for RefusingGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        _context: &[String],
        _question: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Service {
            status: 429,
            message: "rate limited".into(),
        })
    }
}

/// Embedder that never resolves, for exercising the call timeout.
struct StalledEmbedder;

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

fn sample_document() -> String {
    [
        "Calculus studies continuous change. The derivative measures the rate of change and the integral accumulates it.",
        "The empire collapsed after a long war, and the treaty that followed redrew every border on the continent.",
        "Ownership is the core memory model: each value has one owner, a borrow grants temporary access, and a lifetime bounds it.",
    ]
    .join("\n")
}

fn topical_service() -> DocumentQaService {
    DocumentQaService::builder()
        .with_chunking_config(ChunkingConfig {
            max_chunk_size: 160,
            overlap: 0,
            separators: vec!["\n".to_string()],
        })
        .with_embedding_provider(Arc::new(BagOfWordsEmbedder))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build()
}

#[tokio::test]
async fn build_and_answer_end_to_end() {
    let service = topical_service();
    let index = service.build_index(&sample_document()).await.unwrap();
    assert_eq!(index.len(), 3);

    let answer = service
        .answer(&index, "What does a derivative of calculus measure?", 2)
        .await
        .unwrap();

    assert_eq!(answer.context.len(), 2);
    assert!(
        answer.context[0].chunk.text.contains("Calculus"),
        "most similar chunk first, got: {}",
        answer.context[0].chunk.text
    );
    assert!(answer.context[0].score >= answer.context[1].score);
    // the generated text is the mock's echo of exactly what was forwarded
    assert!(answer.text.contains("derivative"));
    assert!(answer.text.contains(&answer.context[0].chunk.text));
}

#[tokio::test]
async fn oversized_k_returns_every_chunk_by_similarity() {
    let service = topical_service();
    let index = service.build_index(&sample_document()).await.unwrap();

    let answer = service
        .answer(&index, "who won the war and signed the treaty?", 50)
        .await
        .unwrap();

    assert_eq!(answer.context.len(), index.len());
    for pair in answer.context.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(answer.context[0].chunk.text.contains("war"));
}

#[tokio::test]
async fn retrieval_is_deterministic_across_calls() {
    let service = topical_service();
    let index = service.build_index(&sample_document()).await.unwrap();

    let first = service.answer(&index, "borrow and lifetime?", 3).await.unwrap();
    let second = service.answer(&index, "borrow and lifetime?", 3).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn equal_scores_fall_back_to_document_order() {
    // Four identical lines chunked disjointly give identical vectors.
    let document = "the calculus chunk repeats\n".repeat(4);
    let service = DocumentQaService::builder()
        .with_chunking_config(ChunkingConfig {
            max_chunk_size: 27,
            overlap: 0,
            separators: vec!["\n".to_string()],
        })
        .with_embedding_provider(Arc::new(BagOfWordsEmbedder))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build();

    let index = service.build_index(&document).await.unwrap();
    assert_eq!(index.len(), 4);

    let answer = service.answer(&index, "calculus?", 4).await.unwrap();
    let order: Vec<usize> = answer.context.iter().map(|hit| hit.chunk.index).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn build_failure_reports_the_index_build_phase() {
    let service = DocumentQaService::builder()
        .with_embedding_provider(Arc::new(UnreachableEmbedder))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build();

    let err = service.build_index(&sample_document()).await.unwrap_err();
    match err {
        QaError::EmbeddingFailure { phase, source } => {
            assert_eq!(phase, EmbeddingPhase::IndexBuild);
            assert!(matches!(source, ProviderError::Transport(_)));
        }
        other => panic!("expected an embedding failure, got {other:?}"),
    }
}

#[tokio::test]
async fn query_embedding_failure_leaves_the_index_reusable() {
    let flaky = DocumentQaService::builder()
        .with_embedding_provider(Arc::new(FirstBatchOnlyEmbedder::new()))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build();

    let index = flaky.build_index(&sample_document()).await.unwrap();

    let err = flaky.answer(&index, "calculus?", 2).await.unwrap_err();
    assert!(matches!(
        err,
        QaError::EmbeddingFailure {
            phase: EmbeddingPhase::Query,
            ..
        }
    ));

    // the same index answers fine once a working embedder is wired in
    let healthy = topical_service();
    let answer = healthy.answer(&index, "calculus?", 2).await.unwrap();
    assert!(answer.context[0].chunk.text.contains("Calculus"));
}

#[tokio::test]
async fn generation_failure_is_query_scoped() {
    let refusing = DocumentQaService::builder()
        .with_embedding_provider(Arc::new(BagOfWordsEmbedder))
        .with_generation_provider(Arc::new(RefusingGenerator))
        .build();

    let index = refusing.build_index(&sample_document()).await.unwrap();
    let err = refusing.answer(&index, "calculus?", 2).await.unwrap_err();
    match err {
        QaError::GenerationFailure { source } => {
            assert_eq!(
                source,
                ProviderError::Service {
                    status: 429,
                    message: "rate limited".into()
                }
            );
        }
        other => panic!("expected a generation failure, got {other:?}"),
    }

    // same index, working generator: the query succeeds
    let healthy = topical_service();
    assert!(healthy.answer(&index, "calculus?", 2).await.is_ok());
}

#[tokio::test]
async fn zero_k_is_a_programmer_error() {
    let service = topical_service();
    let index = service.build_index(&sample_document()).await.unwrap();
    let err = service.answer(&index, "anything", 0).await.unwrap_err();
    assert!(matches!(err, QaError::InvalidConfiguration { .. }));
}

#[tokio::test]
async fn empty_document_builds_an_empty_index() {
    let service = topical_service();
    let index = service.build_index("").await.unwrap();
    assert!(index.is_empty());

    let answer = service.answer(&index, "anything at all?", 3).await.unwrap();
    assert!(answer.context.is_empty());
    assert!(answer.text.contains("(no context)"));
}

#[tokio::test]
async fn invalid_chunking_config_fails_before_embedding() {
    // the unreachable embedder proves no network work happens
    let service = DocumentQaService::builder()
        .with_chunking_config(ChunkingConfig {
            max_chunk_size: 10,
            overlap: 10,
            separators: vec!["\n".to_string()],
        })
        .with_embedding_provider(Arc::new(UnreachableEmbedder))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build();

    let err = service.build_index("some document").await.unwrap_err();
    assert!(matches!(err, QaError::InvalidConfiguration { .. }));
}

#[tokio::test]
async fn shared_index_swaps_without_disturbing_inflight_readers() {
    let service = topical_service();
    let shared = SharedIndex::new();

    let first = service.build_index(&sample_document()).await.unwrap();
    shared.swap(first);
    let held = shared.load().unwrap();

    let replacement = service
        .build_index("A fresh document about ownership and borrow rules.\n")
        .await
        .unwrap();
    let replacement_id = replacement.id();
    shared.swap(replacement);

    // the reader that loaded before the swap still sees the old document
    let answer = service.answer(&held, "calculus?", 1).await.unwrap();
    assert!(answer.context[0].chunk.text.contains("Calculus"));

    assert_eq!(shared.load().unwrap().id(), replacement_id);
}

#[tokio::test(start_paused = true)]
async fn call_timeout_surfaces_as_a_transport_failure() {
    let service = DocumentQaService::builder()
        .with_call_timeout(Duration::from_millis(250))
        .with_embedding_provider(Arc::new(StalledEmbedder))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build();

    let err = service.build_index("a document").await.unwrap_err();
    match err {
        QaError::EmbeddingFailure { phase, source } => {
            assert_eq!(phase, EmbeddingPhase::IndexBuild);
            assert!(matches!(source, ProviderError::Transport(_)));
        }
        other => panic!("expected a timed-out embedding call, got {other:?}"),
    }
}

#[tokio::test]
async fn hash_mock_pipeline_is_stable_end_to_end() {
    // the shipped mock provider exercises the same plumbing without a vocabulary
    let service = DocumentQaService::builder()
        .with_embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .with_generation_provider(Arc::new(MockGenerationProvider::new()))
        .build();

    let document = sample_document();
    let chunks = chunker::split(&document, &ChunkingConfig::default()).unwrap();
    let index = service.build_index(&document).await.unwrap();
    assert_eq!(index.len(), chunks.len());
    assert_eq!(index.dimension(), MockEmbeddingProvider::DEFAULT_DIMENSION);

    let first = service.answer(&index, "stable?", 2).await.unwrap();
    let second = service.answer(&index, "stable?", 2).await.unwrap();
    assert_eq!(first, second);
}
