//! MeshTrafficPermission: allow or deny traffic from groups of clients

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::SpecRules;
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshTrafficPermission resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshTrafficPermission",
    plural = "meshtrafficpermissions",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshTrafficPermissionSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined inplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// From list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<MeshTrafficPermissionFrom>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeshTrafficPermissionFrom {
    /// TargetRef is a reference to the resource that represents a group of
    /// clients.
    pub target_ref: TargetRef,

    /// Default is a configuration specific to the group of clients referenced in
    /// 'targetRef'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TrafficPermissionConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TrafficPermissionConf {
    /// Action defines a behavior for the specified group of clients:
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TrafficAction>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum TrafficAction {
    Allow,
    Deny,
    AllowWithShadowDeny,
}

impl SpecRules for MeshTrafficPermissionSpec {}
