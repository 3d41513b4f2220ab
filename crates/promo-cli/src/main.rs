//! PromoSensei command-line interface.
//!
//! The hosting command layer: maps subcommands to differently-phrased
//! questions and feeds them into the pipeline's single `answer` entry point,
//! mirroring the chat-bot commands the system was built for.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::Command as Subprocess;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use promo_embeddings::{CandleEmbedder, EMBEDDING_DIM};
use promo_generate::{FlanT5Generator, GenerationConfig};
use promo_index::{IndexConfig, OfferIndex};
use promo_rag::{load_offers, OfferIngestor, PromoSensei};
use promo_types::PromoConfig;

#[derive(Parser)]
#[command(name = "promo-sensei", about = "Ask questions about scraped e-commerce promotions")]
struct Cli {
    /// Path to a config file (default: ~/.config/promo-sensei/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Search offers with a free-text query
    Search {
        /// The query text
        query: Vec<String>,
    },
    /// Summarize the top current promotions
    Summary,
    /// List current offers for a brand
    Brand {
        /// The brand name
        name: Vec<String>,
    },
    /// Ask a raw question without any rephrasing
    Ask {
        /// The question text
        question: Vec<String>,
    },
    /// Ingest the current offer snapshot into the index
    Ingest,
    /// Run the configured refresh command, then re-ingest
    Refresh,
    /// Show index statistics
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PromoConfig::load_from(Some(path))?,
        None => PromoConfig::load()?,
    };

    match cli.command {
        Some(Command::Search { query }) => {
            let query = require_arg(query, "search [your query]")?;
            answer_one(&config, &query)
        }
        Some(Command::Summary) => {
            answer_one(&config, "Provide a summary of top current promotions")
        }
        Some(Command::Brand { name }) => {
            let name = require_arg(name, "brand [brand_name]")?;
            answer_one(&config, &format!("List current offers by brand {}", name))
        }
        Some(Command::Ask { question }) => {
            let question = require_arg(question, "ask [your question]")?;
            answer_one(&config, &question)
        }
        Some(Command::Ingest) => ingest(&config),
        Some(Command::Refresh) => refresh(&config),
        Some(Command::Status) => status(&config),
        None => repl(&config),
    }
}

fn require_arg(words: Vec<String>, usage: &str) -> Result<String> {
    let joined = words.join(" ");
    if joined.trim().is_empty() {
        bail!("Usage: promo-sensei {}", usage);
    }
    Ok(joined)
}

fn open_index(config: &PromoConfig) -> Result<Arc<OfferIndex>> {
    let index = OfferIndex::open_or_create(IndexConfig::new(EMBEDDING_DIM, config.index_dir()))
        .context("opening offer index")?;
    Ok(Arc::new(index))
}

fn build_service(config: &PromoConfig) -> Result<PromoSensei<CandleEmbedder, FlanT5Generator>> {
    let embedder = Arc::new(CandleEmbedder::load_default().context("loading embedding model")?);
    let generator = Arc::new(
        FlanT5Generator::load_default(GenerationConfig::default())
            .context("loading generation model")?,
    );
    let index = open_index(config)?;
    Ok(PromoSensei::new(embedder, index, generator, config))
}

fn answer_one(config: &PromoConfig, question: &str) -> Result<()> {
    let service = build_service(config)?;
    let reply = service.answer(question)?;
    println!("{}", reply);
    Ok(())
}

fn ingest(config: &PromoConfig) -> Result<()> {
    let embedder = Arc::new(CandleEmbedder::load_default().context("loading embedding model")?);
    let index = open_index(config)?;
    let ingestor = OfferIngestor::new(embedder, index.clone());

    let offers = load_offers(&config.offers_path);
    let added = ingestor.ingest_new(&offers)?;
    println!("Ingested {} new offers ({} total indexed).", added, index.len());
    Ok(())
}

fn refresh(config: &PromoConfig) -> Result<()> {
    if let Some(command) = &config.refresh_command {
        info!(command = %command, "Running refresh command");
        println!("Refreshing offer data, this may take a while...");
        let status = Subprocess::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .context("running refresh command")?;
        if !status.success() {
            bail!("refresh command exited with {}", status);
        }
    }
    ingest(config)
}

fn status(config: &PromoConfig) -> Result<()> {
    let index = open_index(config)?;
    let stats = index.stats();
    println!("Indexed offers:  {}", stats.offer_count);
    println!("Dimension:       {}", stats.dimension);
    println!("Index size:      {} bytes", stats.size_bytes);
    println!("Offers snapshot: {}", config.offers_path.display());
    Ok(())
}

fn repl(config: &PromoConfig) -> Result<()> {
    let service = build_service(config)?;
    println!("PromoSensei ready. Type a question or 'exit'.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit")
            || question.eq_ignore_ascii_case("quit")
        {
            break;
        }

        match service.answer(question) {
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
