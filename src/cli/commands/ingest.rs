use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::commands::AppContext;
use crate::services::TextSegmenter;

/// Handle the ingest command: segment a file, embed the chunks, upsert them.
pub async fn execute(
    ctx: &AppContext,
    path: PathBuf,
    doc_id: Option<String>,
    title: Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let doc_id = match doc_id {
        Some(id) => id,
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(ToString::to_string)
            .context("Cannot derive a document id from the file name; pass --doc-id")?,
    };
    let title = title.unwrap_or_else(|| doc_id.clone());

    let segmenter = TextSegmenter::new(
        ctx.settings.retrieval.chunk_size,
        ctx.settings.retrieval.chunk_overlap,
    );
    let chunks = segmenter.segment(&text);
    if chunks.is_empty() {
        println!("Nothing to ingest: {} is empty.", path.display());
        return Ok(());
    }
    info!(doc_id = %doc_id, chunks = chunks.len(), "segmented document");

    let vectors = ctx
        .embedding
        .embed_batch(&chunks)
        .await
        .context("Failed to embed document chunks")?;

    let ids: Vec<String> = (0..chunks.len())
        .map(|index| format!("{doc_id}:{index}"))
        .collect();
    let payloads: Vec<serde_json::Value> = chunks
        .iter()
        .enumerate()
        .map(|(index, content)| {
            serde_json::json!({
                "doc_id": format!("{doc_id}:{index}"),
                "title": title,
                "content": content,
                "chunk_index": index,
            })
        })
        .collect();

    ctx.vector_store
        .upsert(&ids, &vectors, &payloads)
        .await
        .context("Failed to upsert into the vector collection")?;

    println!(
        "Ingested {} chunk{} from {} as '{}'",
        chunks.len(),
        if chunks.len() == 1 { "" } else { "s" },
        path.display(),
        doc_id
    );

    Ok(())
}
