//! Table output formatting for CLI commands
//!
//! Formatted table output for provider listings and search results using
//! comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::RetrievalCandidate;
use crate::services::gateway::ProviderStatus;

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format provider presets as a table, marking the configured default.
pub fn format_providers(providers: &[ProviderStatus], default_provider: &str) -> String {
    let mut table = base_table();
    table.set_header(vec![
        Cell::new("Provider").add_attribute(Attribute::Bold),
        Cell::new("Base URL").add_attribute(Attribute::Bold),
        Cell::new("Default Model").add_attribute(Attribute::Bold),
        Cell::new("Configured").add_attribute(Attribute::Bold),
    ]);

    for provider in providers {
        let name = if provider.name == default_provider {
            format!("{} (default)", provider.name)
        } else {
            provider.name.clone()
        };
        let configured = if provider.configured {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(&provider.base_url),
            Cell::new(&provider.default_model),
            configured,
        ]);
    }

    table.to_string()
}

/// Format retrieval candidates as a table with truncated passage previews.
pub fn format_candidates(candidates: &[RetrievalCandidate]) -> String {
    const PREVIEW_CHARS: usize = 80;

    let mut table = base_table();
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Score").add_attribute(Attribute::Bold),
        Cell::new("Source").add_attribute(Attribute::Bold),
        Cell::new("Passage").add_attribute(Attribute::Bold),
    ]);

    for (rank, candidate) in candidates.iter().enumerate() {
        let source = match candidate.title() {
            Some(title) => format!("{title} ({})", candidate.id),
            None => candidate.id.clone(),
        };
        let mut preview: String = candidate.content.chars().take(PREVIEW_CHARS).collect();
        if candidate.content.chars().count() > PREVIEW_CHARS {
            preview.push('…');
        }
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(format!("{:.4}", candidate.score)),
            Cell::new(source),
            Cell::new(preview),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_providers_marks_default() {
        let providers = vec![ProviderStatus {
            name: "glm".to_string(),
            base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            default_model: "glm-4.7".to_string(),
            configured: true,
        }];
        let rendered = format_providers(&providers, "glm");
        assert!(rendered.contains("glm (default)"));
        assert!(rendered.contains("yes"));
    }

    #[test]
    fn test_format_candidates_truncates_preview() {
        let long = "x".repeat(200);
        let candidates = vec![RetrievalCandidate::new(
            "T0251:1",
            long,
            serde_json::json!({ "title": "Heart Sutra" }),
            0.91,
        )];
        let rendered = format_candidates(&candidates);
        assert!(rendered.contains("Heart Sutra (T0251:1)"));
        assert!(rendered.contains('…'));
    }
}
