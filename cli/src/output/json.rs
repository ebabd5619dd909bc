//! JSON output helpers.
//!
//! `--json` prints the full run report on stdout.

use anyhow::{Context, Result};
use hostkit_common::PipelineReport;

/// Pretty-printed run report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_report(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("JSON serialization failed")
}

/// Machine-readable renderer for `--json`.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print the report on stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_report(&self, report: &PipelineReport) -> Result<()> {
        println!("{}", format_report(report)?);
        Ok(())
    }
}
