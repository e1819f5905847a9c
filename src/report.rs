//! Output formatting for scan results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::rules::{Finding, RuleId, Severity};
use crate::runner::ScanResult;

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report envelope.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub files_scanned: usize,
    pub findings: Vec<JsonFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<JsonSkipped>,
}

/// One finding in JSON form.
#[derive(Serialize, Deserialize)]
pub struct JsonFinding {
    pub rule: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A file the scan could not process.
#[derive(Serialize, Deserialize)]
pub struct JsonSkipped {
    pub path: String,
    pub reason: String,
}

/// Write results in JSON format.
pub fn write_json(path: &str, result: &ScanResult) -> anyhow::Result<()> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        files_scanned: result.scanned,
        findings: result.findings.iter().map(finding_to_json).collect(),
        skipped: result
            .skipped
            .iter()
            .map(|s| JsonSkipped {
                path: s.path.clone(),
                reason: s.reason.clone(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn finding_to_json(f: &Finding) -> JsonFinding {
    JsonFinding {
        rule: f.rule.as_str().to_string(),
        severity: f.severity.to_string(),
        file: f.file.clone(),
        line: f.span.start_line,
        column: f.span.start_col,
        message: f.message.clone(),
    }
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "mapcheck";
const HELP_URI: &str = "https://docs.automapper.org/en/latest/9.0-Upgrade-Guide.html";

#[derive(Serialize, Deserialize)]
struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize, Deserialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
struct SarifDriver {
    name: String,
    version: String,
    #[serde(rename = "informationUri")]
    information_uri: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "fullDescription")]
    full_description: SarifMessage,
    #[serde(rename = "helpUri")]
    help_uri: String,
    #[serde(rename = "defaultConfiguration")]
    default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
struct SarifRuleConfig {
    level: String,
}

#[derive(Serialize, Deserialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize, Deserialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    region: SarifRegion,
}

#[derive(Serialize, Deserialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize, Deserialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
    #[serde(rename = "endLine")]
    end_line: usize,
    #[serde(rename = "endColumn")]
    end_column: usize,
}

fn severity_to_level(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

/// Write results in SARIF format.
pub fn write_sarif(result: &ScanResult) -> anyhow::Result<()> {
    // Only describe rules that actually fired; ids sorted for stable output.
    let fired: BTreeSet<&'static str> = result.findings.iter().map(|f| f.rule.as_str()).collect();

    let rules: Vec<SarifRule> = RuleId::ALL
        .iter()
        .filter(|id| fired.contains(id.as_str()))
        .map(|id| SarifRule {
            id: id.as_str().to_string(),
            name: id.name().to_string(),
            short_description: SarifMessage {
                text: format!("Breaking change: {}", id.summary()),
            },
            full_description: SarifMessage {
                text: id.guidance().to_string(),
            },
            help_uri: HELP_URI.to_string(),
            default_config: SarifRuleConfig {
                level: "warning".to_string(),
            },
        })
        .collect();

    let results: Vec<SarifResult> = result
        .findings
        .iter()
        .map(|f| SarifResult {
            rule_id: f.rule.as_str().to_string(),
            level: severity_to_level(&f.severity).to_string(),
            message: SarifMessage {
                text: f.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: f.file.replace('\\', "/"),
                    },
                    region: SarifRegion {
                        start_line: f.span.start_line,
                        start_column: f.span.start_col,
                        end_line: f.span.end_line,
                        end_column: f.span.end_col,
                    },
                },
            }],
        })
        .collect();

    let report = SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    information_uri: HELP_URI.to_string(),
                    rules,
                },
            },
            results,
        }],
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(path: &str, result: &ScanResult) {
    // Header
    println!();
    print!("  ");
    print!("{}", "mapcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Files:    ".dimmed());
    println!("{}", result.scanned);
    println!();

    if !result.findings.is_empty() {
        write_findings(&result.findings);
        println!();
    }

    if !result.skipped.is_empty() {
        println!("  {} ({}):", "Skipped".bold(), result.skipped.len());
        for s in &result.skipped {
            println!("    {} {}", s.path.blue(), s.reason.dimmed());
        }
        println!();
    }

    write_final_status(result);
    println!();
}

fn write_findings(findings: &[Finding]) {
    println!("  {} ({}):", "Breaking changes".bold(), findings.len());
    println!();

    for f in findings {
        write_severity_tag(&f.severity);
        print!("   ");
        print!("{:<8}", f.rule.as_str().dimmed());
        print!("{}", f.file.blue());
        print!(
            "{}",
            format!(":{}:{}", f.span.start_line, f.span.start_col).dimmed()
        );
        println!();

        // Message on next line, indented
        println!("            {}", f.message);
        println!();
    }
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_final_status(result: &ScanResult) {
    if result.findings.is_empty() {
        println!("  {}", "✓ No breaking changes found".green());
    } else {
        let plural = if result.findings.len() != 1 { "s" } else { "" };
        println!(
            "  {}",
            format!("✗ {} breaking change{} found", result.findings.len(), plural).red()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, RuleSet};
    use crate::syntax::{NodeKind, Span};

    fn sample_finding() -> Finding {
        let rules = RuleSet::breaking_changes().unwrap();
        let rule: &Rule = rules.rules_for(NodeKind::Invocation).next().unwrap();
        Finding::new(
            rule,
            "Startup.cs",
            Span {
                start_byte: 0,
                end_byte: 10,
                start_line: 3,
                start_col: 9,
                end_line: 3,
                end_col: 19,
            },
        )
    }

    #[test]
    fn test_finding_to_json() {
        let json = finding_to_json(&sample_finding());
        assert_eq!(json.rule, "AR001");
        assert_eq!(json.severity, "warning");
        assert_eq!(json.line, 3);
        assert_eq!(json.column, 9);
    }

    #[test]
    fn test_json_report_round_trips() {
        let report = JsonReport {
            version: "0.1.0".to_string(),
            path: ".".to_string(),
            files_scanned: 1,
            findings: vec![finding_to_json(&sample_finding())],
            skipped: vec![],
        };
        let json = serde_json::to_string(&report).unwrap();
        let parsed: JsonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.findings.len(), 1);
        assert_eq!(parsed.findings[0].rule, "AR001");
        // Empty skipped list is omitted entirely.
        assert!(!json.contains("skipped"));
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(severity_to_level(&Severity::Warning), "warning");
        assert_eq!(severity_to_level(&Severity::Error), "error");
        assert_eq!(severity_to_level(&Severity::Info), "note");
    }

    #[test]
    fn test_rule_metadata_complete() {
        for id in RuleId::ALL {
            assert!(!id.name().is_empty());
            assert!(!id.summary().is_empty());
            assert!(!id.guidance().is_empty());
        }
    }
}
