use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use llm_requester::LlmPool;
use rust_checker::CompilationChecker;
use single_processor::RepairEngine;

pub mod pkg_config;

pub use pkg_config::{AppConfig, load_config, load_function_context};

#[derive(Parser, Debug)]
#[command(name = "transrepair")]
#[command(version = "0.1")]
#[command(about = "Translate code with an LLM and repair it until it compiles", long_about = None)]
pub struct Cli {
    #[arg(long, short = 'd', global = true, help = "show debug log")]
    pub debug: bool,

    /// Configuration file (TOML)
    #[arg(long, short = 'c', global = true, default_value = "config/config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate one source file, then compile and repair it
    Translate {
        /// Source file (required)
        #[arg(long, short, value_name = "FILE", required = true)]
        input: PathBuf,

        #[arg(long, short, default_value = "C")]
        source_lang: String,

        /// Target language (default: [repair].target_language)
        #[arg(long, short)]
        target_lang: Option<String>,

        /// Model name (default: [llm].model)
        #[arg(long, short)]
        model: Option<String>,

        /// Write the translation here instead of stdout
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip compiling and repairing
        #[arg(long)]
        no_repair: bool,

        /// TOML file with the target signature, dependencies and libraries
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,
    },

    /// Translate every matching file of a directory
    Batch {
        #[arg(long, short, value_name = "DIR", required = true)]
        input_dir: PathBuf,

        #[arg(long, short, value_name = "DIR", required = true)]
        output_dir: PathBuf,

        #[arg(long, short, default_value = "C")]
        source_lang: String,

        #[arg(long, short, default_value = "c")]
        extension: String,

        /// Only generate translations and store their artifacts
        #[arg(long)]
        generate_only: bool,

        /// Files processed at once (default: [repair].concurrent_limit)
        #[arg(long)]
        concurrent_limit: Option<usize>,
    },

    /// Compile one Rust file and print its diagnostics
    Check {
        #[arg(long, short, value_name = "FILE", required = true)]
        input: PathBuf,
    },

    /// Store translation pairs (JSON lines) in the example index
    Index {
        #[arg(long, short, value_name = "FILE", required = true)]
        pairs: PathBuf,
    },

    /// Show the stored examples most similar to a source file
    Retrieve {
        #[arg(long, short, value_name = "FILE", required = true)]
        input: PathBuf,

        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Wire the completion pool, checker and (when enabled) retriever into one
/// engine. An unreachable example index only disables retrieval.
pub async fn build_engine(cfg: &AppConfig) -> Result<RepairEngine> {
    let pool = LlmPool::from_config(&cfg.llm).context("Failed to initialise the LLM pool")?;
    info!("Using {} completion client(s)", pool.client_count());

    let checker = CompilationChecker::from_config(&cfg.checker);
    let engine = RepairEngine::new(Arc::new(pool), Arc::new(checker), &cfg.repair);

    if !cfg.retrieval.enabled {
        info!("Example retrieval disabled");
        return Ok(engine);
    }
    match db_services::connect(&cfg.retrieval).await {
        Ok(retriever) => Ok(engine.with_retriever(Arc::new(retriever), cfg.retrieval.top_k)),
        Err(e) => {
            warn!("Example retrieval unavailable, translating without examples: {}", e);
            Ok(engine)
        }
    }
}
