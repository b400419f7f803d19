//! Plain text report writer.

use std::io::Write;

use ferret_core::prelude::*;

/// Writes one line per finding: location, rule, and commit context when
/// the finding came from history.
pub fn write(findings: &[Finding], writer: &mut dyn Write) -> anyhow::Result<()> {
    for finding in findings {
        if finding.commit.is_empty() {
            writeln!(
                writer,
                "{}:{}:{} {} {}",
                finding.file, finding.start_line, finding.start_column, finding.rule_id, finding.description
            )?;
        } else {
            writeln!(
                writer,
                "{}:{}:{} {} {} (commit {} by {})",
                finding.file,
                finding.start_line,
                finding.start_column,
                finding.rule_id,
                finding.description,
                &finding.commit[..finding.commit.len().min(7)],
                finding.author
            )?;
        }
    }
    Ok(())
}
