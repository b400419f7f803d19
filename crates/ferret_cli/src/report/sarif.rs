//! SARIF report writer.

use std::io::Write;

use ferret_core::prelude::*;
use serde::Serialize;

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
const TOOL_NAME: &str = "ferret";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    short_description: SarifMessage,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

/// Serialises findings as a SARIF v2.1.0 report.
pub fn write(findings: &[Finding], config: &Config, writer: &mut dyn Write) -> anyhow::Result<()> {
    let report = SarifReport {
        schema: SARIF_SCHEMA,
        version: SARIF_VERSION,
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME,
                    rules: build_rules(config),
                },
            },
            results: findings.iter().map(build_result).collect(),
        }],
    };

    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}

fn build_rules(config: &Config) -> Vec<SarifRule> {
    config
        .rules()
        .iter()
        .map(|rule| SarifRule {
            id: rule.id.clone(),
            short_description: SarifMessage {
                text: rule.description.clone(),
            },
        })
        .collect()
}

fn build_result(finding: &Finding) -> SarifResult {
    SarifResult {
        rule_id: finding.rule_id.clone(),
        level: "error",
        message: SarifMessage {
            text: format!("{} detected", finding.description),
        },
        locations: vec![SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation {
                    uri: finding.file.clone(),
                },
                region: SarifRegion {
                    start_line: finding.start_line,
                    start_column: finding.start_column,
                    end_line: finding.end_line,
                    end_column: finding.end_column,
                },
            },
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_schema_rules_and_results() {
        let config = Config::from_toml(
            r#"
            [[rules]]
            id = "aws-access-key"
            description = "AWS Access Key"
            regex = '''AKIA[0-9A-Z]{16}'''
            "#,
        )
        .unwrap();
        let finding = Finding {
            rule_id: "aws-access-key".into(),
            description: "AWS Access Key".into(),
            file: "main.go".into(),
            start_line: 20,
            end_line: 20,
            start_column: 16,
            end_column: 35,
            ..Finding::default()
        };

        let mut out = Vec::new();
        write(&[finding], &config, &mut out).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["version"], "2.1.0");
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "ferret");
        assert_eq!(
            parsed["runs"][0]["tool"]["driver"]["rules"][0]["id"],
            "aws-access-key"
        );

        let result = &parsed["runs"][0]["results"][0];
        assert_eq!(result["ruleId"], "aws-access-key");
        let region = &result["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 20);
        assert_eq!(region["startColumn"], 16);
    }
}
