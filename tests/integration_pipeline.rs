#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests of the load -> chunk -> embed -> index -> answer flow
// using deterministic in-process models

use faq_rag::answer::{AnswerEngine, GENERATION_ERROR_PREFIX, Generator, KNOWLEDGE_BASE_UNAVAILABLE};
use faq_rag::config::{Config, SourcesConfig};
use faq_rag::embeddings::{ChunkingConfig, Embedder};
use faq_rag::index::IndexCache;
use faq_rag::session::{ChatSession, Speaker};
use faq_rag::{FaqError, Result};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Letter-frequency embedder; identical text always maps to the same vector
struct LetterEmbedder {
    calls: AtomicUsize,
}

impl LetterEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for LetterEmbedder {
    fn model_id(&self) -> &str {
        "letters"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; 26];
        for c in text.to_ascii_lowercase().bytes() {
            if c.is_ascii_lowercase() {
                vector[usize::from(c - b'a')] += 1.0;
            }
        }
        Ok(vector)
    }
}

/// Replies with the retrieved context so tests can see what was retrieved
struct ContextEcho;

impl Generator for ContextEcho {
    fn generate(&self, context: &str, _question: &str) -> Result<String> {
        Ok(context.to_string())
    }
}

struct Unavailable;

impl Generator for Unavailable {
    fn generate(&self, _context: &str, _question: &str) -> Result<String> {
        Err(FaqError::Generation("request timed out".to_string()))
    }
}

fn sources_in(dir: &TempDir) -> SourcesConfig {
    SourcesConfig {
        faq_path: dir.path().join("faq.txt"),
        resume_path: dir.path().join("resume.pdf"),
        ..SourcesConfig::default()
    }
}

#[test]
fn chat_over_faq_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let faq = "Office hours are 9 to 5. ".repeat(30);
    fs::write(dir.path().join("faq.txt"), &faq).expect("should write faq");

    let embedder = Arc::new(LetterEmbedder::new());
    let chunking = ChunkingConfig {
        chunk_size: 200,
        chunk_overlap: 50,
    };
    let cache = IndexCache::for_sources(sources_in(&dir), chunking, embedder.clone());
    let engine = AnswerEngine::new(embedder.clone(), Arc::new(ContextEcho)).with_top_k(2);

    let index = cache
        .get_or_build()
        .expect("build should succeed")
        .expect("faq was loaded");
    let chunk_count = index.len();
    assert_eq!(chunk_count, 5);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), chunk_count);

    let mut session = ChatSession::new();
    for question in ["What are your office hours?", "When are you in?"] {
        let index = cache.get_or_build().expect("cached build").expect("index");
        session.submit(&engine, Some(&*index), question);
    }

    // Chunks are embedded once, plus one embedding per question
    assert_eq!(embedder.calls.load(Ordering::SeqCst), chunk_count + 2);

    let turns = session.log().all();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].speaker, Speaker::User);
    assert_eq!(turns[1].speaker, Speaker::Bot);
    assert!(turns[1].text.contains("Office hours are 9 to 5"));
}

#[test]
fn chat_without_knowledge_base() {
    let dir = TempDir::new().expect("should create temp dir");
    let embedder = Arc::new(LetterEmbedder::new());
    let cache = IndexCache::for_sources(
        sources_in(&dir),
        ChunkingConfig::default(),
        embedder.clone(),
    );
    let engine = AnswerEngine::new(embedder.clone(), Arc::new(ContextEcho));

    let index = cache.get_or_build().expect("build should succeed");
    assert!(index.is_none());

    let mut session = ChatSession::new();
    session.submit(&engine, index.as_deref(), "What are your office hours?");

    assert_eq!(session.log().all()[1].text, KNOWLEDGE_BASE_UNAVAILABLE);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn generation_errors_do_not_end_the_conversation() {
    let dir = TempDir::new().expect("should create temp dir");
    fs::write(dir.path().join("faq.txt"), "Office hours are 9 to 5").expect("should write faq");

    let embedder = Arc::new(LetterEmbedder::new());
    let cache = IndexCache::for_sources(
        sources_in(&dir),
        ChunkingConfig::default(),
        embedder.clone(),
    );
    let engine = AnswerEngine::new(embedder, Arc::new(Unavailable));
    let index = cache.get_or_build().expect("build should succeed");

    let mut session = ChatSession::new();
    session.submit(&engine, index.as_deref(), "first");
    session.submit(&engine, index.as_deref(), "second");

    let turns = session.log().all();
    assert_eq!(turns.len(), 4);
    assert!(turns[1].text.starts_with(GENERATION_ERROR_PREFIX));
    assert!(turns[3].text.contains("request timed out"));
}

#[test]
fn config_file_drives_sources() {
    let dir = TempDir::new().expect("should create temp dir");
    let faq_path = dir.path().join("content").join("faq.txt");
    fs::create_dir_all(faq_path.parent().expect("has parent")).expect("should create dir");
    fs::write(&faq_path, "I am based in Lisbon").expect("should write faq");

    let mut config = Config {
        base_dir: dir.path().join(".faq-rag"),
        ..Config::default()
    };
    config.sources.faq_path = faq_path;
    config.save().expect("should save config");

    let loaded = Config::load(dir.path().join(".faq-rag")).expect("should load config");
    let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder::new());
    let cache = IndexCache::for_sources(loaded.sources, loaded.chunking, embedder);

    let index = cache
        .get_or_build()
        .expect("build should succeed")
        .expect("faq was loaded");
    assert_eq!(index.chunks()[0].content, "I am based in Lisbon");
}
