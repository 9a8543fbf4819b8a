//! Chunks a small document, builds an index, and answers two questions.
//!
//! Runs fully offline with the deterministic mock providers. Set
//! `OPENAI_API_KEY` (optionally `OPENAI_API_BASE`) to route the same
//! pipeline through a real OpenAI-compatible endpoint instead:
//!
//! ```bash
//! cargo run --example ask_document
//! OPENAI_API_KEY=sk-... cargo run --example ask_document
//! ```

use std::sync::Arc;

use docquery::config::ChunkingConfig;
use docquery::embeddings::MockEmbeddingProvider;
use docquery::generation::MockGenerationProvider;
use docquery::openai::{OpenAiClient, OpenAiConfig};
use docquery::service::DocumentQaService;

const DOCUMENT: &str = "\
The annual report covers three areas. Revenue grew by twelve percent, driven \
mostly by the subscription business.
Operating costs stayed flat year over year, with infrastructure savings \
offsetting new hiring.
The outlook section projects moderate growth and flags currency risk as the \
main uncertainty for the next fiscal year.
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docquery=debug")),
        )
        .init();

    let builder = DocumentQaService::builder().with_chunking_config(ChunkingConfig {
        max_chunk_size: 160,
        overlap: 40,
        separators: vec!["\n".to_string()],
    });

    let service = match OpenAiConfig::from_env() {
        Some(config) => {
            println!("Using OpenAI-compatible endpoint at {}", config.api_base);
            builder.with_openai(OpenAiClient::new(config)).build()
        }
        None => {
            println!("No OPENAI_API_KEY set; using the offline mock providers.");
            builder
                .with_embedding_provider(Arc::new(MockEmbeddingProvider::new()))
                .with_generation_provider(Arc::new(MockGenerationProvider::new()))
                .build()
        }
    };

    let index = service.build_index(DOCUMENT).await?;
    println!(
        "Indexed {} chunks (dimension {})\n",
        index.len(),
        index.dimension()
    );

    for question in ["How did revenue develop?", "What risks does the outlook name?"] {
        let answer = service.answer(&index, question, 2).await?;
        println!("Q: {question}");
        println!("A: {}", answer.text);
        for hit in &answer.context {
            let preview: String = hit.chunk.text.chars().take(60).collect();
            println!("   [chunk {} | score {:.3}] {preview}…", hit.chunk.index, hit.score);
        }
        println!();
    }

    Ok(())
}
