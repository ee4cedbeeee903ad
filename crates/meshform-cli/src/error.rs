//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`] so that every failure is
//! rendered by miette and mapped to an exit code.

use meshform_core::{CoreError, Diagnostics};
use meshform_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Metadata or spec failed validation
    #[error("Validation failed: {message}")]
    #[diagnostic(code(meshform::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A Kubernetes API call or object conversion failed
    #[error("{summary}")]
    #[diagnostic(code(meshform::cli::cluster))]
    Cluster {
        summary: String,
        #[help]
        detail: Option<String>,
    },

    /// Provider configuration or kubeconfig problem
    #[error("Configuration error: {message}")]
    #[diagnostic(code(meshform::cli::config))]
    Config { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(meshform::cli::io))]
    Io { message: String },

    /// Bad command line input
    #[error("{message}")]
    #[diagnostic(code(meshform::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(meshform::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a usage error with help text
    pub fn usage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an IO error naming the file involved
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }

    fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        let mut iter = diagnostics.iter();
        let Some(first) = iter.next() else {
            return Self::internal("operation failed without diagnostics");
        };

        if first.summary == "Invalid Attribute Value" {
            let details: Vec<&str> = diagnostics.iter().map(|d| d.detail.as_str()).collect();
            return Self::Validation {
                message: details.join("; "),
                help: None,
            };
        }

        Self::Cluster {
            summary: first.summary.clone(),
            detail: Some(first.detail.clone()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownKind { name } => CliError::usage(
                format!("Unknown kind: {}", name),
                "Run `meshform kinds` to list the supported kinds",
            ),
            CoreError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            CoreError::InvalidManifest { message } => CliError::validation(message),
            CoreError::YamlParse(e) => CliError::validation(format!("invalid YAML: {}", e)),
            other => CliError::from_diagnostics(&Diagnostics::from(&other)),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::InvalidConfig(message) => CliError::Config { message },
            KubeError::Kubeconfig(e) => CliError::Config {
                message: e.to_string(),
            },
            KubeError::InferConfig(e) => CliError::Config {
                message: e.to_string(),
            },
            KubeError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            KubeError::ImportId { id } => CliError::usage(
                format!("Unexpected Import Identifier: '{}'", id),
                "Expected import identifier with format: 'namespace/name'",
            ),
            other => CliError::from_diagnostics(&other.diagnostics()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::validation(format!("invalid YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::validation("x").exit_code(), exit_codes::VALIDATION_ERROR);
        assert_eq!(CliError::usage("x", "y").exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(
            CliError::Config { message: "x".into() }.exit_code(),
            exit_codes::CONFIG_ERROR
        );
    }

    #[test]
    fn test_kube_errors_keep_summary() {
        let err = CliError::from(KubeError::NotFound {
            kind: "MeshTimeout".into(),
            namespace: "kuma-system".into(),
            name: "gone".into(),
        });
        assert_eq!(err.exit_code(), exit_codes::CLUSTER_ERROR);
        assert_eq!(err.to_string(), "Unable to GET resource");
        match err {
            CliError::Cluster { detail, .. } => {
                assert!(detail.unwrap().contains("GET Error (MeshTimeout): kuma-system/gone not found"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_core_validation_errors() {
        let err = CliError::from(CoreError::metadata("metadata.name", "must not be empty"));
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_ERROR);
        assert_eq!(
            err.to_string(),
            "Validation failed: metadata.name: must not be empty"
        );

        let err = CliError::from(CoreError::UnknownKind { name: "Foo".into() });
        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);
    }
}
