//! Error types for meshform-kube

use meshform_core::{CoreError, Diagnostic, Diagnostics};
use thiserror::Error;

/// Result type for meshform-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while configuring the provider or talking to the cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Error reported by a non-Kubernetes backend
    #[error("backend error: {0}")]
    Backend(String),

    /// Object absent on a data source read
    #[error("{namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// GET failed
    #[error("GET {kind} failed: {source}")]
    Get {
        kind: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Server-side apply failed
    #[error("APPLY {kind} failed: {source}")]
    Apply {
        kind: String,
        #[source]
        source: Box<KubeError>,
    },

    /// DELETE failed
    #[error("DELETE {kind} failed: {source}")]
    Delete {
        kind: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Server object did not match the typed struct
    #[error("failed to unmarshal {kind}: {message}")]
    Unmarshal { kind: String, message: String },

    /// Import identifier is not `namespace/name`
    #[error("expected import identifier with format: 'namespace/name'. Got: '{id}'")]
    ImportId { id: String },

    /// Type name does not name any data source or resource
    #[error("unknown type name '{0}'")]
    UnknownType(String),

    /// Invalid input
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubeconfig could not be loaded
    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// No usable cluster configuration found
    #[error("could not infer cluster configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            KubeError::NotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a conflict error (409), e.g. a field manager conflict on apply
    pub fn is_conflict(&self) -> bool {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 409,
            KubeError::Apply { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    pub(crate) fn get(kind: &str, source: KubeError) -> Self {
        KubeError::Get {
            kind: kind.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn apply(kind: &str, source: KubeError) -> Self {
        KubeError::Apply {
            kind: kind.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn delete(kind: &str, source: KubeError) -> Self {
        KubeError::Delete {
            kind: kind.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn unmarshal(kind: &str, error: impl std::fmt::Display) -> Self {
        KubeError::Unmarshal {
            kind: kind.to_string(),
            message: error.to_string(),
        }
    }

    /// User-facing diagnostics with the fixed summary for each failure
    pub fn diagnostics(&self) -> Diagnostics {
        match self {
            KubeError::NotFound { kind, .. } => {
                Diagnostic::unexpected("Unable to GET resource", "reading", "GET", kind, self).into()
            }
            KubeError::Get { kind, source } => {
                Diagnostic::unexpected("Unable to GET resource", "reading", "GET", kind, source)
                    .into()
            }
            KubeError::Apply { kind, source } => Diagnostic::unexpected(
                "Unable to APPLY resource",
                "applying",
                "APPLY",
                kind,
                source,
            )
            .into(),
            KubeError::Delete { kind, source } => Diagnostic::unexpected(
                "Unable to DELETE resource",
                "deleting",
                "DELETE",
                kind,
                source,
            )
            .into(),
            KubeError::Unmarshal { kind, message } => Diagnostic::unexpected(
                "Unable to unmarshal resource",
                "reading",
                "Unmarshal",
                kind,
                message,
            )
            .into(),
            KubeError::ImportId { id } => Diagnostic::error(
                "Unexpected Import Identifier",
                format!(
                    "Expected import identifier with format: 'namespace/name'. Got: '{}'",
                    id
                ),
            )
            .into(),
            KubeError::Core(core) => Diagnostics::from(core),
            other => Diagnostic::error("Provider error", other.to_string()).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_diagnostic() {
        let err = KubeError::NotFound {
            kind: "MeshTimeout".into(),
            namespace: "kuma-system".into(),
            name: "missing".into(),
        };
        assert!(err.is_not_found());

        let diags = err.diagnostics();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Unable to GET resource");
        assert!(
            diag.detail
                .ends_with("GET Error (MeshTimeout): kuma-system/missing not found")
        );
    }

    #[test]
    fn test_apply_diagnostic_wraps_source() {
        let err = KubeError::apply("MeshRetry", KubeError::Backend("connection refused".into()));
        let diags = err.diagnostics();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Unable to APPLY resource");
        assert!(diag.detail.contains("APPLY Error (MeshRetry): backend error: connection refused"));
    }

    #[test]
    fn test_import_id_diagnostic() {
        let err = KubeError::ImportId { id: "bogus".into() };
        let diags = err.diagnostics();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Unexpected Import Identifier");
        assert_eq!(
            diag.detail,
            "Expected import identifier with format: 'namespace/name'. Got: 'bogus'"
        );
    }

    #[test]
    fn test_core_errors_become_attribute_diagnostics() {
        let err = KubeError::from(CoreError::metadata("metadata.name", "must not be empty"));
        let diags = err.diagnostics();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid Attribute Value");
        assert_eq!(diag.attribute.as_deref(), Some("metadata.name"));
    }

    #[test]
    fn test_api_status_codes() {
        let not_found = KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".into(),
            message: "not found".into(),
            reason: "NotFound".into(),
            code: 404,
        }));
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = KubeError::apply(
            "MeshTrace",
            KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".into(),
                message: "conflict".into(),
                reason: "Conflict".into(),
                code: 409,
            })),
        );
        assert!(conflict.is_conflict());
    }
}
