use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::answer::AnswerEngine;
use crate::config::Config;
use crate::documents::{configured_sources, load_documents};
use crate::embeddings::{Embedder, OllamaClient, chunk_documents};
use crate::index::{IndexCache, SearchResult, VectorIndex};
use crate::session::{ChatSession, Speaker, Turn};

const QUIT_COMMANDS: &[&str] = &["/quit", "/exit"];

/// Answer a single question and print the reply
#[inline]
pub fn ask_question(config: &Config, question: &str, show_sources: bool) -> Result<()> {
    let (engine, cache) = build_engine(config)?;
    let index = load_index(&cache);

    let mut session = ChatSession::new();
    let Some((turns, sources)) = session.submit_with_sources(&engine, index.as_deref(), question)
    else {
        println!("Please enter a question.");
        return Ok(());
    };

    if let Some(answer) = turns.iter().find(|t| t.speaker == Speaker::Bot) {
        println!("{}", answer.text);
    }

    if show_sources && !sources.is_empty() {
        print_sources(&sources);
    }

    Ok(())
}

/// Interactive chat loop on the terminal until `/quit` or end of input
#[inline]
pub fn run_chat(config: &Config) -> Result<()> {
    let (engine, cache) = build_engine(config)?;

    eprintln!("{}", style("🤖 Ask Me Anything").bold().cyan());
    eprintln!(
        "{}",
        style("Type a question and press enter. /quit to leave.").dim()
    );
    eprintln!();

    let mut session = ChatSession::new();

    loop {
        let question: String = match Input::new()
            .with_prompt("💬 Your Question")
            .allow_empty(true)
            .interact_text()
        {
            Ok(question) => question,
            Err(e) => {
                info!("Input closed: {}", e);
                break;
            }
        };

        if QUIT_COMMANDS.contains(&question.trim()) {
            break;
        }

        let index = load_index(&cache);
        if let Some(turns) = session.submit(&engine, index.as_deref(), &question) {
            for turn in turns.iter().filter(|t| t.speaker == Speaker::Bot) {
                print_turn(turn);
            }
        }
    }

    info!(
        "Chat session ended after {} turns",
        session.log().all().len()
    );
    Ok(())
}

/// Show which sources load, how they chunk, and whether Ollama is reachable
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    let sources = configured_sources(&config.sources);
    let report = load_documents(&sources, config.sources.max_file_size);

    println!("Knowledge Base Sources:");
    for document in &report.documents {
        match document.metadata.page {
            Some(page) => println!(
                "  ✓ {} (page {}, {} chars)",
                document.metadata.source,
                page,
                document.content.chars().count()
            ),
            None => println!(
                "  ✓ {} ({} chars)",
                document.metadata.source,
                document.content.chars().count()
            ),
        }
    }
    for skipped in &report.skipped {
        println!("  ✗ {} ({})", skipped.path.display(), skipped.reason);
    }

    if report.is_empty() {
        println!();
        println!("No documents available; the bot will report the knowledge base as unavailable.");
    } else {
        let chunks = chunk_documents(&report.documents, &config.chunking)
            .context("Failed to chunk documents")?;
        println!();
        println!(
            "Chunks: {} ({} chars, {} overlap)",
            chunks.len(),
            config.chunking.chunk_size,
            config.chunking.chunk_overlap
        );
    }

    println!();
    println!("Ollama:");
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    match client.health_check() {
        Ok(()) => println!(
            "  ✓ {} and {} available",
            config.ollama.embedding_model, config.ollama.generation_model
        ),
        Err(e) => println!("  ✗ {:#}", e),
    }

    Ok(())
}

fn build_engine(config: &Config) -> Result<(AnswerEngine, IndexCache)> {
    let client =
        Arc::new(OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?);
    let embedder: Arc<dyn Embedder> = client.clone();

    let cache = IndexCache::for_sources(
        config.sources.clone(),
        config.chunking.clone(),
        Arc::clone(&embedder),
    );
    let engine = AnswerEngine::new(embedder, client).with_top_k(config.retrieval.top_k);

    Ok((engine, cache))
}

/// Fetch the index, building it on first use. A failed build leaves the
/// session without a knowledge base.
fn load_index(cache: &IndexCache) -> Option<Arc<VectorIndex>> {
    let bar = if !cache.is_built() && console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        );
        bar.set_message("Building knowledge base...");
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    } else {
        ProgressBar::hidden()
    };

    let result = cache.get_or_build();
    bar.finish_and_clear();

    match result {
        Ok(index) => index,
        Err(e) => {
            error!("Failed to build knowledge base index: {}", e);
            None
        }
    }
}

fn print_turn(turn: &Turn) {
    match turn.speaker {
        Speaker::User => println!("{}", style(turn).bold()),
        Speaker::Bot => println!("{}", style(turn).green()),
    }
}

fn print_sources(sources: &[SearchResult]) {
    println!();
    println!("Sources:");
    for result in sources {
        let metadata = &result.chunk.metadata;
        match metadata.page {
            Some(page) => println!(
                "  {} p.{} #{} (distance {:.3})",
                metadata.source, page, result.chunk.chunk_index, result.distance
            ),
            None => println!(
                "  {} #{} (distance {:.3})",
                metadata.source, result.chunk.chunk_index, result.distance
            ),
        }
    }
}
