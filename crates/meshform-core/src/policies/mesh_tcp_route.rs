//! MeshTCPRoute: L4 traffic splitting and redirection

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::SpecRules;
use crate::target_ref::{BackendRef, TargetRef};

/// Spec is the specification of the Kuma MeshTCPRoute resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshTCPRoute",
    root = "MeshTcpRoute",
    plural = "meshtcproutes",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshTcpRouteSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined in-place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// To list makes a match between the consumed services and corresponding
    /// configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<TcpRouteTo>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TcpRouteTo {
    /// TargetRef is a reference to the resource that represents a group of
    /// request destinations.
    pub target_ref: TargetRef,

    /// Rules contains the routing rules applies to a combination of top-level
    /// targetRef and the targetRef in this entry.
    #[schemars(length(max = 1))]
    pub rules: Vec<TcpRouteRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TcpRouteRule {
    /// Default holds routing rules that can be merged with rules from other
    /// policies.
    pub default: TcpRouteConf,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TcpRouteConf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1))]
    pub backend_refs: Option<Vec<BackendRef>>,
}

impl SpecRules for MeshTcpRouteSpec {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target_ref::TargetRefKind;

    #[test]
    fn test_unmarshal_tcp_route() {
        let json = serde_json::json!({
            "targetRef": {"kind": "MeshService", "name": "frontend"},
            "to": [{
                "targetRef": {"kind": "MeshService", "name": "backend"},
                "rules": [{
                    "default": {
                        "backendRefs": [
                            {"kind": "MeshServiceSubset", "name": "backend", "tags": {"version": "v1"}, "weight": 90},
                            {"kind": "MeshService", "name": "backend-v2", "port": 8080, "weight": 10}
                        ]
                    }
                }]
            }]
        });

        let spec: MeshTcpRouteSpec = serde_json::from_value(json).unwrap();
        let to = spec.to.unwrap().remove(0);
        let refs = to.rules[0].default.backend_refs.as_ref().unwrap();
        assert_eq!(refs[0].target.kind, TargetRefKind::MeshServiceSubset);
        assert_eq!(refs[0].weight, Some(90));
        assert_eq!(refs[1].port, Some(8080));
    }

    #[test]
    fn test_crd_kind_keeps_acronym() {
        use kube::Resource;
        assert_eq!(MeshTcpRoute::kind(&()), "MeshTCPRoute");
        assert_eq!(MeshTcpRoute::plural(&()), "meshtcproutes");
    }
}
