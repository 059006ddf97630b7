use clap::{Parser, Subcommand};
use faq_rag::Result;
use faq_rag::commands::{ask_question, run_chat, show_status};
use faq_rag::config::{Config, get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "faq-rag")]
#[command(about = "Ask questions answered from an FAQ file and resume")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.faq-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, models and knowledge base sources
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,
        /// Also print the chunks the answer was generated from
        #[arg(long)]
        sources: bool,
    },
    /// Start an interactive chat session
    Chat,
    /// Show knowledge base and Ollama status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| faq_rag::FaqError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ask { question, sources } => {
            ask_question(&Config::load(&config_dir)?, &question, sources)?;
        }
        Commands::Chat => {
            run_chat(&Config::load(&config_dir)?)?;
        }
        Commands::Status => {
            show_status(&Config::load(&config_dir)?)?;
        }
    }

    Ok(())
}
