//! User-facing diagnostics with fixed summaries
//!
//! Every failure that reaches a caller is reported as a summary line, a
//! detail paragraph and, for input problems, the offending attribute path.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::schema::ValidationIssue;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// "Invalid Attribute Value" pointing at `path`
    pub fn invalid_attribute(path: impl Into<String>, message: impl fmt::Display) -> Self {
        let path = path.into();
        Self {
            severity: Severity::Error,
            summary: "Invalid Attribute Value".to_string(),
            detail: format!("{}: {}", path, message),
            attribute: Some(path),
        }
    }

    /// Unexpected failure while talking to the cluster or converting objects.
    ///
    /// `action` completes "while ... the resource", `operation` names the
    /// failing step (`GET`, `APPLY`, `DELETE`, `Unmarshal`, `Marshal`).
    pub fn unexpected(
        summary: impl Into<String>,
        action: &str,
        operation: &str,
        kind: &str,
        error: impl fmt::Display,
    ) -> Self {
        Self::error(
            summary,
            format!(
                "An unexpected error occurred while {} the resource. \
                 Please report this issue to the provider developers.\n\n\
                 {} Error ({}): {}",
                action, operation, kind, error
            ),
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        write!(f, "{}: {}", level, self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "\n\n{}", self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

fn spec_attribute(issue: &ValidationIssue) -> String {
    if issue.path == "(root)" {
        "spec".to_string()
    } else {
        format!("spec{}", issue.path)
    }
}

impl From<&CoreError> for Diagnostics {
    fn from(error: &CoreError) -> Self {
        match error {
            CoreError::InvalidMetadata { field, message } => {
                Diagnostic::invalid_attribute(field.as_str(), message).into()
            }
            CoreError::SpecValidation { issues, .. } => issues
                .iter()
                .map(|issue| Diagnostic::invalid_attribute(spec_attribute(issue), &issue.message))
                .collect(),
            CoreError::InvalidSpec { message, .. } => {
                Diagnostic::invalid_attribute("spec", message).into()
            }
            CoreError::Multiple(errors) => errors.iter().flat_map(|e| Diagnostics::from(e)).collect(),
            CoreError::MissingField { field } => {
                Diagnostic::invalid_attribute(field.as_str(), "is required").into()
            }
            CoreError::UnknownKind { name } => {
                Diagnostic::invalid_attribute("kind", format!("unknown kind '{}'", name)).into()
            }
            CoreError::Marshal { kind, message } => Diagnostic::unexpected(
                "Unable to marshal manifest",
                "rendering",
                "Marshal",
                kind,
                message,
            )
            .into(),
            other => Diagnostic::error("Invalid manifest", other.to_string()).into(),
        }
    }
}

/// Ordered collection of diagnostics
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
