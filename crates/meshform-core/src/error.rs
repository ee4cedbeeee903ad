//! Core error types

use thiserror::Error;

use crate::schema::ValidationIssue;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown kind: {name}")]
    UnknownKind { name: String },

    #[error("Invalid metadata: {field}: {message}")]
    InvalidMetadata { field: String, message: String },

    #[error("Spec of {kind} failed validation: {message}")]
    InvalidSpec { kind: String, message: String },

    #[error("Spec of {kind} failed validation:\n{}", format_issues(issues))]
    SpecValidation {
        kind: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("Failed to marshal {kind}: {message}")]
    Marshal { kind: String, message: String },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Several independent problems with one object
    #[error("{}", format_errors(.0))]
    Multiple(Vec<CoreError>),
}

impl CoreError {
    /// Shorthand for a metadata validation failure
    pub fn metadata(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidMetadata {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Fold collected errors into one; `None` when there are none
    pub fn combine(mut errors: Vec<CoreError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(CoreError::Multiple(errors)),
        }
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_errors(errors: &[CoreError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, CoreError>;
