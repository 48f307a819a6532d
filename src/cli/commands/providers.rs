use anyhow::Result;

use crate::cli::commands::AppContext;
use crate::cli::table::format_providers;

/// Handle the providers command: list presets and credential status.
pub fn execute(ctx: &AppContext, json: bool) -> Result<()> {
    let providers = ctx.gateway.list_providers();

    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
    } else {
        println!(
            "{}",
            format_providers(&providers, &ctx.settings.default_provider)
        );
    }

    Ok(())
}
