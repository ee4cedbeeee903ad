//! State models handed back to callers after a read or apply

use serde::{Deserialize, Serialize};

use crate::kind::PolicyKind;
use crate::metadata::ObjectMetadata;

/// State of a data source or resource
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyState<S> {
    /// `namespace/name`
    pub id: String,
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMetadata,
    pub spec: S,
}

impl<S> PolicyState<S> {
    pub fn new(kind: PolicyKind, metadata: ObjectMetadata, spec: S) -> Self {
        Self {
            id: metadata.id(),
            api_version: kind.api_version().to_string(),
            kind: kind.kind().to_string(),
            metadata,
            spec,
        }
    }

    /// Change the spec representation, keeping everything else
    pub fn map_spec<T>(self, f: impl FnOnce(S) -> T) -> PolicyState<T> {
        PolicyState {
            id: self.id,
            api_version: self.api_version,
            kind: self.kind,
            metadata: self.metadata,
            spec: f(self.spec),
        }
    }

    pub fn try_map_spec<T, E>(
        self,
        f: impl FnOnce(S) -> Result<T, E>,
    ) -> Result<PolicyState<T>, E> {
        Ok(PolicyState {
            id: self.id,
            api_version: self.api_version,
            kind: self.kind,
            metadata: self.metadata,
            spec: f(self.spec)?,
        })
    }
}

/// State of a manifest data source: the inputs plus the rendered YAML
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ManifestState<S> {
    pub id: String,
    pub metadata: ObjectMetadata,
    pub spec: S,
    pub yaml: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_state_identity() {
        let state = PolicyState::new(
            PolicyKind::MeshHttpRoute,
            ObjectMetadata::new("route", "kuma-demo"),
            serde_json::json!({}),
        );
        assert_eq!(state.id, "kuma-demo/route");
        assert_eq!(state.kind, "MeshHTTPRoute");
        assert_eq!(state.api_version, "kuma.io/v1alpha1");

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["apiVersion"], "kuma.io/v1alpha1");
        assert_eq!(json["metadata"]["namespace"], "kuma-demo");
    }

    #[test]
    fn test_map_spec() {
        let state = PolicyState::new(
            PolicyKind::MeshRetry,
            ObjectMetadata::new("r", "ns"),
            1u8,
        );
        let mapped = state.map_spec(|n| n.to_string());
        assert_eq!(mapped.spec, "1");
        assert_eq!(mapped.id, "ns/r");

        let failed: Result<PolicyState<u8>, &str> = mapped.try_map_spec(|_| Err("boom"));
        assert_eq!(failed.unwrap_err(), "boom");
    }
}
