//! Command-line interface.

pub mod commands;
pub mod table;
pub mod types;

pub use types::{Cli, Commands};

use anyhow::Result;

use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging;

/// Load configuration, wire services, and dispatch the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    logging::init(&settings.logging);

    let ctx = commands::AppContext::build(settings)?;

    match cli.command {
        Commands::Ask {
            question,
            provider,
            model,
            base_url,
            api_key,
            no_retrieval,
            no_stream,
        } => {
            commands::ask::execute(
                &ctx,
                commands::ask::AskArgs {
                    question,
                    provider,
                    model,
                    base_url,
                    api_key,
                    no_retrieval,
                    no_stream,
                },
            )
            .await
        }
        Commands::Search {
            query,
            top_k,
            no_rerank,
        } => commands::search::execute(&ctx, query, top_k, no_rerank, cli.json).await,
        Commands::Ingest {
            path,
            doc_id,
            title,
        } => commands::ingest::execute(&ctx, path, doc_id, title).await,
        Commands::Providers => commands::providers::execute(&ctx, cli.json),
        Commands::Info => commands::info::execute(&ctx, cli.json).await,
    }
}

/// Print a top-level error and exit non-zero.
pub fn handle_error(err: &anyhow::Error) -> ! {
    eprintln!("Error: {err:#}");
    std::process::exit(1);
}
