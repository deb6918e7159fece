//! Markdown summary generation
//!
//! This module renders a human-readable markdown report of a crawl run.

use crate::output::summary::RunSummary;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run
///
/// # Arguments
///
/// * `summary` - The finished run summary
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Catalog Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Status**: {}\n", summary.state));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration_seconds() {
        md.push_str(&format!("- **Duration**: {:.1} seconds\n", duration));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Pages\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Attempted | {} |\n", summary.pages_attempted));
    md.push_str(&format!("| Succeeded | {} |\n", summary.pages_succeeded));
    md.push_str(&format!("| Empty | {} |\n", summary.pages_empty));
    md.push_str(&format!("| Failed | {} |\n\n", summary.pages_failed));

    md.push_str("## Records\n\n");
    md.push_str(&format!("- **Written**: {}\n", summary.records_written));
    md.push_str(&format!("- **Skipped**: {}\n", summary.records_skipped));
    md.push_str(&format!("- **Discarded**: {}\n\n", summary.records_discarded));

    if !summary.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| Page | Stage | Message |\n");
        md.push_str("|------|-------|---------|\n");

        for error in &summary.errors {
            let page = error
                .page_index
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page,
                error.stage,
                error.message.replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    md
}
