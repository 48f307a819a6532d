use anyhow::{Context, Result};

use crate::cli::commands::AppContext;

/// Handle the info command: report vector collection status.
pub async fn execute(ctx: &AppContext, json: bool) -> Result<()> {
    let info = ctx
        .vector_store
        .collection_info()
        .await
        .context("Failed to query the vector collection")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Collection:  {}", info.name);
        println!("Status:      {}", info.status);
        println!("Points:      {}", info.points_count);
        println!("Vectors:     {}", info.vectors_count);
    }

    Ok(())
}
