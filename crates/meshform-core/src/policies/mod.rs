//! Typed models of the Kuma `kuma.io/v1alpha1` policy CRDs
//!
//! Each submodule declares one kind with `kube::CustomResource`. The spec
//! structs are the single source of truth for field names, descriptions and
//! validators; the generated JSON schema and CRD derive from them.

pub mod container_patch;
pub mod mesh_access_log;
pub mod mesh_circuit_breaker;
pub mod mesh_fault_injection;
pub mod mesh_health_check;
pub mod mesh_http_route;
pub mod mesh_load_balancing_strategy;
pub mod mesh_rate_limit;
pub mod mesh_retry;
pub mod mesh_tcp_route;
pub mod mesh_timeout;
pub mod mesh_trace;
pub mod mesh_traffic_permission;

pub use container_patch::{ContainerPatch, ContainerPatchSpec};
pub use mesh_access_log::{MeshAccessLog, MeshAccessLogSpec};
pub use mesh_circuit_breaker::{MeshCircuitBreaker, MeshCircuitBreakerSpec};
pub use mesh_fault_injection::{MeshFaultInjection, MeshFaultInjectionSpec};
pub use mesh_health_check::{MeshHealthCheck, MeshHealthCheckSpec};
pub use mesh_http_route::{MeshHttpRoute, MeshHttpRouteSpec};
pub use mesh_load_balancing_strategy::{MeshLoadBalancingStrategy, MeshLoadBalancingStrategySpec};
pub use mesh_rate_limit::{MeshRateLimit, MeshRateLimitSpec};
pub use mesh_retry::{MeshRetry, MeshRetrySpec};
pub use mesh_tcp_route::{MeshTcpRoute, MeshTcpRouteSpec};
pub use mesh_timeout::{MeshTimeout, MeshTimeoutSpec};
pub use mesh_trace::{MeshTrace, MeshTraceSpec};
pub use mesh_traffic_permission::{MeshTrafficPermission, MeshTrafficPermissionSpec};
