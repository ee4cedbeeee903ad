//! Target references select the proxies and destinations a policy applies to

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of the referenced resource
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum TargetRefKind {
    Mesh,
    MeshSubset,
    MeshGateway,
    MeshService,
    MeshExternalService,
    MeshMultiZoneService,
    MeshServiceSubset,
    #[serde(rename = "MeshHTTPRoute")]
    MeshHttpRoute,
    Dataplane,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ProxyType {
    Sidecar,
    Gateway,
}

/// TargetRef defines structure that allows attaching policy to various resources
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    /// Kind of the referenced resource
    pub kind: TargetRefKind,

    /// Name of the referenced resource. Can only be used with kinds: `MeshService`,
    /// `MeshServiceSubset` and `MeshGatewayRoute`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Namespace specifies the namespace of target resource. If empty only resources in policy namespace
    /// will be targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Mesh is reserved for future use to identify cross mesh resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,

    /// Tags used to select a subset of proxies by tags. Can only be used with kinds
    /// `MeshSubset` and `MeshServiceSubset`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    /// Labels are used to select group of MeshServices that match labels. Either Labels or
    /// Name and Namespace can be used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    /// ProxyTypes specifies the data plane types that are subject to the policy. When not specified,
    /// all data plane types are targeted by the policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_types: Option<Vec<ProxyType>>,

    /// SectionName is used to target specific section of resource.
    /// For example, you can target port from MeshService.ports[] by its name. Only traffic to this port will be affected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
}

impl TargetRef {
    /// Reference selecting every proxy in the mesh
    pub fn mesh() -> Self {
        Self::of_kind(TargetRefKind::Mesh)
    }

    /// Reference to a named `MeshService`
    pub fn mesh_service(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of_kind(TargetRefKind::MeshService)
        }
    }

    fn of_kind(kind: TargetRefKind) -> Self {
        Self {
            kind,
            name: None,
            namespace: None,
            mesh: None,
            tags: None,
            labels: None,
            proxy_types: None,
            section_name: None,
        }
    }
}

/// BackendRef defines where to forward traffic.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendRef {
    #[serde(flatten)]
    pub target: TargetRef,

    /// Port is only supported when this ref refers to a real MeshService object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub weight: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_ref_parse() {
        let json = serde_json::json!({
            "kind": "MeshSubset",
            "tags": {"kuma.io/zone": "east"},
            "proxyTypes": ["Sidecar"],
            "sectionName": "http",
        });
        let tr: TargetRef = serde_json::from_value(json).unwrap();
        assert_eq!(tr.kind, TargetRefKind::MeshSubset);
        assert_eq!(tr.tags.unwrap()["kuma.io/zone"], "east");
        assert_eq!(tr.proxy_types, Some(vec![ProxyType::Sidecar]));
        assert_eq!(tr.section_name.as_deref(), Some("http"));
    }

    #[test]
    fn test_http_route_kind_name() {
        let json = serde_json::to_value(TargetRefKind::MeshHttpRoute).unwrap();
        assert_eq!(json, "MeshHTTPRoute");
    }

    #[test]
    fn test_mesh_omits_empty_fields() {
        let json = serde_json::to_value(TargetRef::mesh()).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "Mesh"}));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<TargetRef, _> =
            serde_json::from_value(serde_json::json!({"kind": "Pod"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_ref_flattens_target() {
        let br = BackendRef {
            target: TargetRef::mesh_service("backend"),
            port: Some(8080),
            weight: Some(90),
        };
        let json = serde_json::to_value(&br).unwrap();
        assert_eq!(json["kind"], "MeshService");
        assert_eq!(json["name"], "backend");
        assert_eq!(json["weight"], 90);
    }
}
