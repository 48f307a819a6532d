//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Lectern - Retrieval-augmented question answering", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question, answered with retrieved corpus context
    Ask {
        /// The question to answer (positional argument)
        question: String,

        /// Provider preset to use (defaults to the configured provider)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Custom OpenAI-compatible endpoint, bypasses preset lookup
        #[arg(long)]
        base_url: Option<String>,

        /// Credential override for this call
        #[arg(long, env = "LECTERN_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Answer from the model alone, without corpus retrieval
        #[arg(long)]
        no_retrieval: bool,

        /// Wait for the complete answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },

    /// Search the corpus without generating an answer
    Search {
        /// Search query (positional argument)
        query: String,

        /// Number of passages to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Return raw vector-similarity order, skipping the rerank pass
        #[arg(long)]
        no_rerank: bool,
    },

    /// Ingest a text file into the corpus collection
    Ingest {
        /// Path to a UTF-8 text file
        path: PathBuf,

        /// Document identifier (defaults to the file stem)
        #[arg(short, long)]
        doc_id: Option<String>,

        /// Title stored in the passage payloads (defaults to the doc id)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List provider presets and their credential status
    Providers,

    /// Show vector collection status
    Info,
}
