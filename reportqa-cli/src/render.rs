//! Rendering an analysis run for the terminal or a file.

use anyhow::{Context, Result};
use clap::ValueEnum;
use reportqa_core::{export, AnalysisRun, SkipReason};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

pub fn render(run: &AnalysisRun, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table(run)),
        OutputFormat::Json => export::to_json(run),
        OutputFormat::Csv => Ok(export::to_csv(&run.findings)),
    }
}

fn reason_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Failed => "failed",
        SkipReason::Panicked => "unexpected fault",
        SkipReason::ModelUnavailable => "model unavailable",
        SkipReason::Timeout => "timed out",
    }
}

fn table(run: &AnalysisRun) -> String {
    let mut out = String::new();
    if run.findings.is_empty() {
        out.push_str("No findings.\n");
    } else {
        out.push_str(&format!(
            "{:<9} {:<20} {:<18} {}\n",
            "SEVERITY", "LOCATION", "CHECK", "MESSAGE"
        ));
        for f in &run.findings {
            out.push_str(&format!(
                "{:<9} {:<20} {:<18} {}\n",
                f.severity.as_str(),
                f.segment_location.to_string(),
                f.check_id.as_str(),
                f.message
            ));
        }
    }

    out.push('\n');
    out.push_str(&run.summary());
    out.push('\n');
    for marker in &run.skipped {
        out.push_str(&format!(
            "  skipped {} [{}]: {} ({})\n",
            marker.check_id,
            marker.language,
            reason_label(marker.reason),
            marker.detail
        ));
    }
    out
}

/// Write to `path`, or stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
            }
            fs::write(path, content)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
        }
        None => print!("{content}"),
    }
    Ok(())
}
