//! Kind registry
//!
//! Maps the runtime notion of a policy kind (a CLI argument, the `kind` of a
//! manifest document, a data source type name) onto the typed CRD structs in
//! [`crate::policies`].

use std::fmt;
use std::str::FromStr;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{ApiResource, NamespaceResourceScope};
use kube::{CustomResourceExt, Resource};
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::policies::*;
use crate::schema::{SpecRules, check_rules};

pub const GROUP: &str = "kuma.io";
pub const VERSION: &str = "v1alpha1";
pub const API_VERSION: &str = "kuma.io/v1alpha1";

/// A namespaced Kuma policy CRD with a typed spec
pub trait Policy:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + CustomResourceExt
    + Serialize
    + DeserializeOwned
    + Clone
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
    type Spec: Serialize
        + DeserializeOwned
        + JsonSchema
        + SpecRules
        + Clone
        + PartialEq
        + fmt::Debug
        + Send
        + Sync
        + 'static;

    const KIND: PolicyKind;

    /// Assemble an object from its metadata and spec
    fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self;

    /// Split an object into its metadata and spec
    fn into_parts(self) -> (ObjectMeta, Self::Spec);
}

macro_rules! policy_kinds {
    ($( $variant:ident => $ty:ident, $spec:ident, $kind:literal, $plural:literal, $snake:literal; )*) => {
        /// Every policy kind known to meshform
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum PolicyKind {
            $( $variant, )*
        }

        impl PolicyKind {
            pub const ALL: &'static [PolicyKind] = &[ $( PolicyKind::$variant, )* ];

            /// CRD kind, e.g. `MeshHTTPRoute`
            pub fn kind(self) -> &'static str {
                match self {
                    $( PolicyKind::$variant => $kind, )*
                }
            }

            /// Lowercase plural used in API paths, e.g. `meshhttproutes`
            pub fn plural(self) -> &'static str {
                match self {
                    $( PolicyKind::$variant => $plural, )*
                }
            }

            /// Data source and resource type name, e.g. `kuma_io_mesh_http_route_v1alpha1`
            pub fn type_name(self) -> &'static str {
                match self {
                    $( PolicyKind::$variant => concat!("kuma_io_", $snake, "_v1alpha1"), )*
                }
            }

            /// Manifest data source type name
            pub fn manifest_type_name(self) -> &'static str {
                match self {
                    $( PolicyKind::$variant => concat!("kuma_io_", $snake, "_v1alpha1_manifest"), )*
                }
            }

            pub fn api_resource(self) -> ApiResource {
                match self {
                    $( PolicyKind::$variant => ApiResource::erase::<$ty>(&()), )*
                }
            }

            /// JSON schema of the spec, generated from the typed struct
            pub fn spec_schema(self) -> Value {
                match self {
                    $( PolicyKind::$variant => schema_value::<$spec>(), )*
                }
            }

            pub fn crd(self) -> CustomResourceDefinition {
                match self {
                    $( PolicyKind::$variant => <$ty as CustomResourceExt>::crd(), )*
                }
            }

            /// Round-trip a spec through its typed struct.
            ///
            /// Unknown fields are dropped, type mismatches are rejected and
            /// the kind's semantic rules are checked.
            pub fn normalize_spec(self, spec: Value) -> Result<Value> {
                match self {
                    $( PolicyKind::$variant => normalize::<$spec>(self, spec), )*
                }
            }
        }

        $(
            impl Policy for $ty {
                type Spec = $spec;

                const KIND: PolicyKind = PolicyKind::$variant;

                fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self {
                    let mut object = $ty::new("", spec);
                    object.metadata = metadata;
                    object
                }

                fn into_parts(self) -> (ObjectMeta, Self::Spec) {
                    (self.metadata, self.spec)
                }
            }
        )*
    };
}

policy_kinds! {
    ContainerPatch => ContainerPatch, ContainerPatchSpec, "ContainerPatch", "containerpatches", "container_patch";
    MeshAccessLog => MeshAccessLog, MeshAccessLogSpec, "MeshAccessLog", "meshaccesslogs", "mesh_access_log";
    MeshCircuitBreaker => MeshCircuitBreaker, MeshCircuitBreakerSpec, "MeshCircuitBreaker", "meshcircuitbreakers", "mesh_circuit_breaker";
    MeshFaultInjection => MeshFaultInjection, MeshFaultInjectionSpec, "MeshFaultInjection", "meshfaultinjections", "mesh_fault_injection";
    MeshHealthCheck => MeshHealthCheck, MeshHealthCheckSpec, "MeshHealthCheck", "meshhealthchecks", "mesh_health_check";
    MeshHttpRoute => MeshHttpRoute, MeshHttpRouteSpec, "MeshHTTPRoute", "meshhttproutes", "mesh_http_route";
    MeshLoadBalancingStrategy => MeshLoadBalancingStrategy, MeshLoadBalancingStrategySpec, "MeshLoadBalancingStrategy", "meshloadbalancingstrategies", "mesh_load_balancing_strategy";
    MeshRateLimit => MeshRateLimit, MeshRateLimitSpec, "MeshRateLimit", "meshratelimits", "mesh_rate_limit";
    MeshRetry => MeshRetry, MeshRetrySpec, "MeshRetry", "meshretries", "mesh_retry";
    MeshTcpRoute => MeshTcpRoute, MeshTcpRouteSpec, "MeshTCPRoute", "meshtcproutes", "mesh_tcp_route";
    MeshTimeout => MeshTimeout, MeshTimeoutSpec, "MeshTimeout", "meshtimeouts", "mesh_timeout";
    MeshTrace => MeshTrace, MeshTraceSpec, "MeshTrace", "meshtraces", "mesh_trace";
    MeshTrafficPermission => MeshTrafficPermission, MeshTrafficPermissionSpec, "MeshTrafficPermission", "meshtrafficpermissions", "mesh_traffic_permission";
}

impl PolicyKind {
    pub fn api_version(self) -> &'static str {
        API_VERSION
    }

    /// Exact match on the CRD kind, as found in a manifest document
    pub fn from_kind(kind: &str) -> Option<Self> {
        PolicyKind::ALL.iter().copied().find(|k| k.kind() == kind)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl FromStr for PolicyKind {
    type Err = CoreError;

    /// Accepts the kind or plural (any case), or either type name
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        PolicyKind::ALL
            .iter()
            .copied()
            .find(|k| {
                k.kind().eq_ignore_ascii_case(needle)
                    || k.plural().eq_ignore_ascii_case(needle)
                    || k.type_name() == needle
                    || k.manifest_type_name() == needle
            })
            .ok_or_else(|| CoreError::UnknownKind {
                name: needle.to_string(),
            })
    }
}

/// Schema in the shape kube generates for CRDs: OpenAPI v3 flavored, with
/// every subschema inlined so validation errors point at the leaf field
fn schema_value<S: JsonSchema>() -> Value {
    let schema = SchemaSettings::openapi3()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator()
        .into_root_schema_for::<S>();
    // RootSchema serialization cannot fail: keys are strings
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

fn normalize<S>(kind: PolicyKind, spec: Value) -> Result<Value>
where
    S: Serialize + DeserializeOwned + SpecRules,
{
    let typed: S = serde_json::from_value(spec).map_err(|e| CoreError::InvalidSpec {
        kind: kind.kind().to_string(),
        message: e.to_string(),
    })?;
    check_rules(kind, &typed)?;
    Ok(serde_json::to_value(typed)?)
}

/// Dispatch a runtime [`PolicyKind`] to its typed CRD struct.
///
/// ```ignore
/// let crd = with_policy_type!(kind, K => K::crd());
/// ```
#[macro_export]
macro_rules! with_policy_type {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::kind::PolicyKind::ContainerPatch => {
                type $t = $crate::policies::ContainerPatch;
                $body
            }
            $crate::kind::PolicyKind::MeshAccessLog => {
                type $t = $crate::policies::MeshAccessLog;
                $body
            }
            $crate::kind::PolicyKind::MeshCircuitBreaker => {
                type $t = $crate::policies::MeshCircuitBreaker;
                $body
            }
            $crate::kind::PolicyKind::MeshFaultInjection => {
                type $t = $crate::policies::MeshFaultInjection;
                $body
            }
            $crate::kind::PolicyKind::MeshHealthCheck => {
                type $t = $crate::policies::MeshHealthCheck;
                $body
            }
            $crate::kind::PolicyKind::MeshHttpRoute => {
                type $t = $crate::policies::MeshHttpRoute;
                $body
            }
            $crate::kind::PolicyKind::MeshLoadBalancingStrategy => {
                type $t = $crate::policies::MeshLoadBalancingStrategy;
                $body
            }
            $crate::kind::PolicyKind::MeshRateLimit => {
                type $t = $crate::policies::MeshRateLimit;
                $body
            }
            $crate::kind::PolicyKind::MeshRetry => {
                type $t = $crate::policies::MeshRetry;
                $body
            }
            $crate::kind::PolicyKind::MeshTcpRoute => {
                type $t = $crate::policies::MeshTcpRoute;
                $body
            }
            $crate::kind::PolicyKind::MeshTimeout => {
                type $t = $crate::policies::MeshTimeout;
                $body
            }
            $crate::kind::PolicyKind::MeshTrace => {
                type $t = $crate::policies::MeshTrace;
                $body
            }
            $crate::kind::PolicyKind::MeshTrafficPermission => {
                type $t = $crate::policies::MeshTrafficPermission;
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_derived_resources() {
        for kind in PolicyKind::ALL {
            let ar = kind.api_resource();
            assert_eq!(ar.kind, kind.kind());
            assert_eq!(ar.plural, kind.plural());
            assert_eq!(ar.group, GROUP);
            assert_eq!(ar.version, VERSION);
            assert_eq!(ar.api_version, kind.api_version());
        }
        assert_eq!(PolicyKind::ALL.len(), 13);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(
            PolicyKind::MeshHttpRoute.type_name(),
            "kuma_io_mesh_http_route_v1alpha1"
        );
        assert_eq!(
            PolicyKind::MeshTimeout.manifest_type_name(),
            "kuma_io_mesh_timeout_v1alpha1_manifest"
        );
    }

    #[test]
    fn test_from_str_variants() {
        assert_eq!("MeshTimeout".parse::<PolicyKind>().unwrap(), PolicyKind::MeshTimeout);
        assert_eq!("meshhttproute".parse::<PolicyKind>().unwrap(), PolicyKind::MeshHttpRoute);
        assert_eq!("meshretries".parse::<PolicyKind>().unwrap(), PolicyKind::MeshRetry);
        assert_eq!(
            "kuma_io_mesh_tcp_route_v1alpha1".parse::<PolicyKind>().unwrap(),
            PolicyKind::MeshTcpRoute
        );
        assert_eq!(
            "kuma_io_container_patch_v1alpha1_manifest"
                .parse::<PolicyKind>()
                .unwrap(),
            PolicyKind::ContainerPatch
        );

        assert_eq!(PolicyKind::from_kind("MeshTCPRoute"), Some(PolicyKind::MeshTcpRoute));
        assert_eq!(PolicyKind::from_kind("meshtcproute"), None);

        let err = "MeshGateway".parse::<PolicyKind>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownKind { name } if name == "MeshGateway"));
    }

    #[test]
    fn test_crd_is_namespaced() {
        let crd = PolicyKind::MeshTrafficPermission.crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("meshtrafficpermissions.kuma.io")
        );
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.kind, "MeshTrafficPermission");
    }

    #[test]
    fn test_spec_schema_has_properties() {
        let schema = PolicyKind::MeshTimeout.spec_schema();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("targetRef"));
        assert!(props.contains_key("from"));
        assert!(props.contains_key("to"));
        assert!(props.contains_key("rules"));
    }

    #[test]
    fn test_normalize_drops_unknown_fields() {
        let spec = serde_json::json!({
            "targetRef": {"kind": "Mesh", "extra": true},
            "bogus": 1
        });
        let normalized = PolicyKind::MeshTimeout.normalize_spec(spec).unwrap();
        assert_eq!(normalized, serde_json::json!({"targetRef": {"kind": "Mesh"}}));
    }

    #[test]
    fn test_normalize_rejects_type_mismatch() {
        let spec = serde_json::json!({"targetRef": {"kind": "NotAKind"}});
        let err = PolicyKind::MeshRetry.normalize_spec(spec).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSpec { kind, .. } if kind == "MeshRetry"));
    }

    #[test]
    fn test_normalize_checks_semantic_rules() {
        let spec = serde_json::json!({
            "sidecarPatch": [{"op": "add", "path": "/x"}]
        });
        let err = PolicyKind::ContainerPatch.normalize_spec(spec).unwrap_err();
        match err {
            CoreError::SpecValidation { kind, issues } => {
                assert_eq!(kind, "ContainerPatch");
                assert_eq!(issues[0].path, "/sidecarPatch/0/value");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_with_policy_type_dispatch() {
        for kind in PolicyKind::ALL {
            let dispatched = with_policy_type!(*kind, K => <K as Policy>::KIND);
            assert_eq!(dispatched, *kind);
        }
    }

    #[test]
    fn test_parts_round_trip() {
        let meta = ObjectMeta {
            name: Some("timeout".into()),
            namespace: Some("kuma-system".into()),
            ..Default::default()
        };
        let obj = MeshTimeout::from_parts(meta.clone(), MeshTimeoutSpec::default());
        assert_eq!(obj.metadata, meta);
        let (m, s) = obj.into_parts();
        assert_eq!(m.name.as_deref(), Some("timeout"));
        assert_eq!(s, MeshTimeoutSpec::default());
    }
}
