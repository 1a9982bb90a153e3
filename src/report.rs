//! Output formatting for extdeps results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::analysis::FileRecord;
use crate::registry::ClassRegistry;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Format::Pretty),
            "json" => Ok(Format::Json),
            other => Err(format!("invalid format: {} (use pretty or json)", other)),
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Summary of one indexed registry.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexReport {
    pub version: String,
    pub registry: String,
    pub snapshot: String,
    pub classes: usize,
    pub files: usize,
}

impl IndexReport {
    pub fn new(registry: &str, snapshot: &str, index: &ClassRegistry) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            registry: registry.to_string(),
            snapshot: snapshot.to_string(),
            classes: index.class_count(),
            files: index.file_count(),
        }
    }
}

/// Records matching a class query.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryReport {
    pub version: String,
    pub registry: String,
    pub query: String,
    pub results: Vec<FileRecord>,
}

impl QueryReport {
    pub fn new(registry: &str, query: &str, results: Vec<&FileRecord>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            registry: registry.to_string(),
            query: query.to_string(),
            results: results.into_iter().cloned().collect(),
        }
    }
}

/// Outcome of a rewrite batch.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RewriteReport {
    pub rewritten: Vec<String>,
    pub failed: Vec<RewriteFailure>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewriteFailure {
    pub file: String,
    pub error: String,
}

impl RewriteReport {
    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Print any report as pretty JSON.
pub fn write_json<T: Serialize>(report: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header() {
    println!();
    print!("  ");
    print!("{}", "extdeps".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

pub fn write_index_pretty(report: &IndexReport) {
    write_header();
    print!("  {}", "Registry: ".dimmed());
    println!("{}", report.registry);
    print!("  {}", "Snapshot: ".dimmed());
    println!("{}", report.snapshot);
    println!();
    println!(
        "  {} {} classes in {} files",
        "✓".green(),
        report.classes.to_string().bold(),
        report.files.to_string().bold()
    );
    println!();
}

pub fn write_query_pretty(report: &QueryReport) {
    write_header();
    print!("  {}", "Query:    ".dimmed());
    println!("{}", report.query);
    print!("  {}", "Registry: ".dimmed());
    println!("{}", report.registry);
    println!();

    if report.results.is_empty() {
        println!("  {}", "no matching classes".yellow());
        println!();
        return;
    }

    println!("  {} ({}):", "Files".bold(), report.results.len());
    println!();
    for record in &report.results {
        write_record(record);
    }
}

pub fn write_record_pretty(record: &FileRecord) {
    write_header();
    write_record(record);
}

fn write_record(record: &FileRecord) {
    println!("    {}", record.src.blue());
    if !record.names.is_empty() {
        let names: Vec<&str> = record.names.iter().map(|s| s.as_str()).collect();
        println!("      {:<10}{}", "names".dimmed(), names.join(", "));
    }
    if !record.requires.is_empty() {
        println!("      {:<10}{}", "requires".dimmed(), record.requires.join(", "));
    }
    if let Some(target) = &record.overrides {
        println!("      {:<10}{}", "override".dimmed(), target.magenta());
    }
    println!();
}

pub fn write_rewrite_pretty(report: &RewriteReport) {
    write_header();
    for file in &report.rewritten {
        println!("    {} {}", "OK  ".green(), file.blue());
    }
    for failure in &report.failed {
        println!("    {} {}", "FAIL".red(), failure.file.blue());
        println!("         {}", failure.error);
    }
    println!();

    let summary = format!(
        "{} rewritten, {} failed",
        report.rewritten.len(),
        report.failed.len()
    );
    if report.passed() {
        println!("  {}", summary.green());
    } else {
        println!("  {}", summary.red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert_eq!("pretty".parse::<Format>(), Ok(Format::Pretty));
        assert!("sarif".parse::<Format>().is_err());
    }

    #[test]
    fn test_query_report_fields() {
        let mut record = FileRecord::new("ext/Panel.js");
        record.add_name("Ext.Panel");
        record.set_override("Ext.Component");
        let report = QueryReport::new("ext", "Ext.Panel", vec![&record]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["query"], "Ext.Panel");
        assert_eq!(json["results"][0]["src"], "ext/Panel.js");
        assert_eq!(json["results"][0]["override"], "Ext.Component");
    }

    #[test]
    fn test_rewrite_report_passed() {
        let mut report = RewriteReport::default();
        report.rewritten.push("a.js".to_string());
        assert!(report.passed());
        report.failed.push(RewriteFailure {
            file: "b.js".to_string(),
            error: "couldn't resolve class: X".to_string(),
        });
        assert!(!report.passed());
    }
}
