#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance
// Run with: cargo test --test integration_ollama -- --ignored

use faq_rag::answer::{AnswerEngine, GENERATION_ERROR_PREFIX, Generator};
use faq_rag::config::OllamaConfig;
use faq_rag::documents::{Document, DocumentMetadata};
use faq_rag::embeddings::{ChunkingConfig, Embedder, OllamaClient};
use faq_rag::index::build_index;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const TEST_EMBEDDING_MODEL: &str = "all-minilm:latest";
const TEST_GENERATION_MODEL: &str = "llama3.2:latest";
const DEFAULT_OLLAMA_HOST: &str = "localhost";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

fn create_integration_test_client() -> OllamaClient {
    let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
    let port = env::var("OLLAMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_OLLAMA_PORT);
    let embedding_model =
        env::var("OLLAMA_EMBEDDING_MODEL").unwrap_or_else(|_| TEST_EMBEDDING_MODEL.to_string());
    let generation_model =
        env::var("OLLAMA_GENERATION_MODEL").unwrap_or_else(|_| TEST_GENERATION_MODEL.to_string());

    let config = OllamaConfig {
        host,
        port,
        embedding_model,
        generation_model,
        batch_size: 5, // Smaller batch size for testing
        ..OllamaConfig::default()
    };

    OllamaClient::new(&config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(60)) // Longer timeout for embedding generation
        .with_retry_attempts(3)
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore error if already initialized
}

fn faq(content: &str) -> Document {
    Document {
        content: content.to_string(),
        metadata: DocumentMetadata {
            source: "faq.txt".to_string(),
            content_type: "text/plain".to_string(),
            page: None,
        },
    }
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();

    let client = create_integration_test_client();
    let result = client.health_check();

    assert!(
        result.is_ok(),
        "Health check should succeed with local Ollama: {:?}",
        result
    );
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_embeddings_are_deterministic() {
    init_test_tracing();

    let client = create_integration_test_client();
    let text = "Office hours are 9 to 5";

    let first = client.embed(text).expect("embedding should succeed");
    let second = client.embed(text).expect("embedding should succeed");

    assert!(!first.is_empty(), "Embedding should not be empty");
    assert_eq!(first, second);
    info!("Embedding has {} dimensions", first.len());
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_batch_embeddings() {
    init_test_tracing();

    let client = create_integration_test_client();

    let test_texts = vec![
        "I build computer vision models.".to_string(),
        "I write dashboards for analytics teams.".to_string(),
        "Office hours are 9 to 5.".to_string(),
        "You can reach me by email.".to_string(),
        "I have worked on retrieval-augmented generation.".to_string(),
        "I studied data science.".to_string(),
    ];

    let embeddings = client
        .embed_batch(&test_texts)
        .expect("Batch embedding generation should succeed");

    assert_eq!(embeddings.len(), test_texts.len());
    let first_dim = embeddings[0].len();
    assert!(embeddings.iter().all(|e| e.len() == first_dim));
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_answers_from_context() {
    init_test_tracing();

    let client = Arc::new(create_integration_test_client());
    let documents = vec![
        faq("Office hours are 9 to 5, Monday to Friday."),
        faq("I am based in Lisbon and work remotely."),
        faq("My main tools are Python, PyTorch and SQL."),
    ];

    let index = build_index(&documents, client.as_ref(), &ChunkingConfig::default())
        .expect("index should build")
        .expect("documents were provided");

    let engine = AnswerEngine::new(client.clone(), client);
    let answer = engine.answer("What are your office hours?", Some(&index));

    info!("Answer: {}", answer);
    assert!(!answer.starts_with(GENERATION_ERROR_PREFIX), "{}", answer);
    assert!(!answer.is_empty());
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_unknown_generation_model_is_reported() {
    init_test_tracing();

    let config = OllamaConfig {
        generation_model: "definitely-not-a-model:latest".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create Ollama client");

    let result = client.generate("Office hours are 9 to 5", "When are you in?");
    assert!(result.is_err());
}
