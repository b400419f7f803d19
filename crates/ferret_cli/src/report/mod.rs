//! Report writers for scan results.

mod json;
mod sarif;
mod text;

use std::io::Write;

use ferret_core::prelude::*;

/// Output format for the findings report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// One line per finding, human readable.
    #[default]
    Text,
    /// Machine-readable JSON array.
    Json,
    /// SARIF (Static Analysis Results Interchange Format) v2.1.0.
    Sarif,
}

/// Serialises findings to the given writer in the requested format.
pub fn write(
    findings: &[Finding],
    config: &Config,
    format: ReportFormat,
    writer: &mut dyn Write,
) -> anyhow::Result<()> {
    match format {
        ReportFormat::Text => text::write(findings, writer),
        ReportFormat::Json => json::write(findings, writer),
        ReportFormat::Sarif => sarif::write(findings, config, writer),
    }
}
