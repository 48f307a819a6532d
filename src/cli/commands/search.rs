use anyhow::{Context, Result};

use crate::cli::commands::AppContext;
use crate::cli::table::format_candidates;

/// Handle the search command: retrieval only, no generation.
pub async fn execute(
    ctx: &AppContext,
    query: String,
    top_k: Option<usize>,
    no_rerank: bool,
    json: bool,
) -> Result<()> {
    let top_k = top_k.unwrap_or(ctx.settings.retrieval.default_top_k);
    let candidates = ctx
        .orchestrator
        .search(&query, top_k, None, !no_rerank)
        .await
        .context("Search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else if candidates.is_empty() {
        println!("No passages found.");
    } else {
        println!("{}", format_candidates(&candidates));
        println!(
            "\nShowing {} passage{}",
            candidates.len(),
            if candidates.len() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}
