//! Display formatting for CLI output
//!
//! Validation results are grouped by file, with one line per offending
//! document or attribute.

use std::collections::BTreeMap;

use console::style;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A validation problem with location information
#[derive(Debug, Clone, Serialize)]
pub struct ReportIssue {
    pub severity: Severity,
    pub file: String,
    /// Document the issue belongs to, e.g. `MeshTimeout kuma-system/timeout`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub document: String,
    /// Attribute path, e.g. `spec/to/0/default/idleTimeout`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    pub message: String,
}

/// Grouped validation results for display
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ReportIssue>,
    pub validated_count: usize,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, file: &str, document: &str, path: &str, message: &str) {
        self.push(Severity::Error, file, document, path, message);
    }

    pub fn add_warning(&mut self, file: &str, document: &str, path: &str, message: &str) {
        self.push(Severity::Warning, file, document, path, message);
    }

    fn push(&mut self, severity: Severity, file: &str, document: &str, path: &str, message: &str) {
        self.issues.push(ReportIssue {
            severity,
            file: file.to_string(),
            document: document.to_string(),
            path: path.to_string(),
            message: message.to_string(),
        });
    }

    /// Display issues grouped by file
    pub fn display(&self) {
        let mut by_file: BTreeMap<&str, Vec<&ReportIssue>> = BTreeMap::new();
        for issue in &self.issues {
            by_file.entry(&issue.file).or_default().push(issue);
        }

        for (file, issues) in by_file {
            println!();
            println!("{}", style(file).cyan().bold());

            for issue in issues {
                let icon = match issue.severity {
                    Severity::Error => style("✗").red(),
                    Severity::Warning => style("⚠").yellow(),
                };

                let document = if issue.document.is_empty() {
                    String::new()
                } else {
                    format!("{}: ", style(&issue.document).yellow())
                };

                let path = if issue.path.is_empty() {
                    String::new()
                } else {
                    format!(" at {}", style(&issue.path).dim())
                };

                println!("  {} {}{}{}", icon, document, issue.message, path);
            }
        }
    }

    /// Error and warning counts
    pub fn summary(&self) -> (usize, usize) {
        let errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        (errors, self.issues.len() - errors)
    }

    pub fn print_summary(&self) {
        let (errors, warnings) = self.summary();
        if errors > 0 {
            println!(
                "{} Validation failed: {} error(s), {} warning(s)",
                style("✗").red().bold(),
                errors,
                warnings
            );
        } else if warnings > 0 {
            println!(
                "{} Validation passed with {} warning(s)",
                style("⚠").yellow().bold(),
                warnings
            );
        } else {
            println!(
                "{} Validation passed! {} document(s) checked",
                style("✓").green().bold(),
                self.validated_count
            );
        }
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}
