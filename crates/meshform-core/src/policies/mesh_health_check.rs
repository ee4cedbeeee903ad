//! MeshHealthCheck: active health checking of upstream endpoints

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{HeaderValue, Percentage};
use crate::schema::{SpecRules, ValidationIssue};
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshHealthCheck resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshHealthCheck",
    plural = "meshhealthchecks",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshHealthCheckSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined inplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// To list makes a match between the consumed services and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<MeshHealthCheckTo>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeshHealthCheckTo {
    pub target_ref: TargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<HealthCheckConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckConf {
    /// Interval between consecutive health checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub interval: Option<String>,

    /// Maximum time to wait for a health check response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub timeout: Option<String>,

    /// Number of consecutive unhealthy checks before considering a host
    /// unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<i32>,

    /// Number of consecutive healthy checks before considering a host
    /// healthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<i32>,

    /// If specified, Envoy will start health checking after a random time in
    /// ms between 0 and initialJitter. This only applies to the first health
    /// check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub initial_jitter: Option<String>,

    /// If specified, during every interval Envoy will add IntervalJitter to the
    /// wait time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub interval_jitter: Option<String>,

    /// If specified, during every interval Envoy will add IntervalJitter *
    /// IntervalJitterPercent / 100 to the wait time. If IntervalJitter and
    /// IntervalJitterPercent are both set, both of them will be used to
    /// increase the wait time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_jitter_percent: Option<i32>,

    /// Allows to configure panic threshold for Envoy cluster. If not specified,
    /// the default is 50%. To disable panic mode, set to 0%.
    /// Either int or decimal represented as string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_panic_threshold: Option<Percentage>,

    /// If set to true, Envoy will not consider any hosts when the cluster is in
    /// 'panic mode'. Instead, the cluster will fail all requests as if all hosts
    /// are unhealthy. This can help avoid potentially overwhelming a failing
    /// service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_traffic_on_panic: Option<bool>,

    /// Specifies the path to the file where Envoy can log health check events.
    /// If empty, no event log will be written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log_path: Option<String>,

    /// If set to true, health check failure events will always be logged. If set
    /// to false, only the initial health check failure event will be logged. The
    /// default value is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_log_health_check_failures: Option<bool>,

    /// Reuse health check connection between health checks. Default is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_connection: Option<bool>,

    /// The "no traffic interval" is a special health check interval that is used
    /// when a cluster has never had traffic routed to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub no_traffic_interval: Option<String>,

    /// HttpHealthCheck is used to configure HTTP health checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpHealthCheck>,

    /// TcpHealthCheck is used to configure TCP health checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpHealthCheck>,

    /// GrpcHealthCheck is used to configure gRPC health checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<GrpcHealthCheck>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpHealthCheck {
    /// If true the HttpHealthCheck is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// The HTTP path which will be requested during the health check
    /// (ie. /health)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// The list of HTTP headers which should be added to each health check
    /// request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers_to_add: Option<HeadersToAdd>,

    /// List of HTTP response statuses which are considered healthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_statuses: Option<Vec<i32>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct HeadersToAdd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 16))]
    pub add: Option<Vec<HeaderValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 16))]
    pub set: Option<Vec<HeaderValue>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TcpHealthCheck {
    /// If true the TcpHealthCheck is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Base64 encoded content of the message which will be sent during the
    /// health check to the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<String>,

    /// List of Base64 encoded blocks of strings expected as a response. When
    /// checking the response, "fuzzy" matching is performed such that each block
    /// must be found, and in the order specified, but not necessarily
    /// contiguous. If not provided or empty, checks will be performed as
    /// "connect only" and be marked as successful when TCP connection is
    /// successfully established.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcHealthCheck {
    /// If true the GrpcHealthCheck is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Service name parameter which will be sent to gRPC service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// The value of the :authority header in the gRPC health check request,
    /// by default name of the cluster this health check is associated with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

impl SpecRules for MeshHealthCheckSpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        self.to
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, to)| {
                let threshold = to.default.as_ref()?.healthy_panic_threshold.as_ref()?;
                threshold.range_issue(format!("/to/{}/default/healthyPanicThreshold", i))
            })
            .collect()
    }
}
