//! Generation capability boundary.

use async_trait::async_trait;

use crate::types::ProviderError;

/// External capability that produces an answer from a system prompt, the
/// retrieved context, and the user's question.
///
/// `context` arrives already ordered (most similar first) and the returned
/// text is passed back to the caller verbatim; implementations should not
/// expect the pipeline to post-process or retry.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &[String],
        question: &str,
    ) -> Result<String, ProviderError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Network-free generator that echoes its inputs, so tests can assert what
/// the pipeline actually forwarded.
#[derive(Clone, Debug, Default)]
pub struct MockGenerationProvider;

impl MockGenerationProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &[String],
        question: &str,
    ) -> Result<String, ProviderError> {
        let context_block = if context.is_empty() {
            "(no context)".to_string()
        } else {
            context.join(" | ")
        };
        Ok(format!("[{system_prompt}] {question} -> {context_block}"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
