//! MeshRetry: retry behaviour for TCP, HTTP and gRPC outbound traffic

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{BackOff, HeaderMatch};
use crate::schema::SpecRules;
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshRetry resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshRetry",
    plural = "meshretries",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshRetrySpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// To list makes a match between the consumed services and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<MeshRetryTo>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeshRetryTo {
    /// TargetRef is a reference to the resource that represents a group of
    /// destinations.
    pub target_ref: TargetRef,

    /// Default is a configuration specific to the group of destinations referenced in
    /// 'targetRef'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RetryConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct RetryConf {
    /// TCP defines a configuration of retries for TCP traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpRetry>,

    /// HTTP defines a configuration of retries for HTTP traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpRetry>,

    /// GRPC defines a configuration of retries for GRPC traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<GrpcRetry>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TcpRetry {
    /// MaxConnectAttempt is a maximal amount of TCP connection attempts
    /// which will be made before giving up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub max_connect_attempt: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRetry {
    /// NumRetries is the number of attempts that will be made on failed (and
    /// retriable) requests.  If not set, the default value is 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_retries: Option<u32>,

    /// PerTryTimeout is the amount of time after which retry attempt should time out.
    /// If left unspecified, the global route timeout for the request will be used.
    /// Setting this timeout to 0 will disable it. Default is 15s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub per_try_timeout: Option<String>,

    /// BackOff is a configuration of durations which will be used in exponential
    /// backoff strategy between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_off: Option<BackOff>,

    /// RateLimitedBackOff is a configuration of backoff which will be used when
    /// the upstream returns one of the headers configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limited_back_off: Option<RateLimitedBackOff>,

    /// RetryOn is a list of conditions which will cause a retry. Available values are:
    /// [5XX, GatewayError, Reset, Retriable4xx, ConnectFailure, EnvoyRatelimited,
    /// RefusedStream, Http3PostConnectFailure, HttpMethodConnect, HttpMethodDelete,
    /// HttpMethodGet, HttpMethodHead, HttpMethodOptions, HttpMethodPatch,
    /// HttpMethodPost, HttpMethodPut, HttpMethodTrace].
    /// Also, any HTTP status code (500, 503, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on: Option<Vec<String>>,

    /// RetriableResponseHeaders is an HTTP response headers that trigger a retry
    /// if present in the response. A retry will be triggered if any of the header
    /// matches the upstream response headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retriable_response_headers: Option<Vec<HeaderMatch>>,

    /// RetriableRequestHeaders is an HTTP headers which must be present in the request
    /// for retries to be attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retriable_request_headers: Option<Vec<HeaderMatch>>,

    /// HostSelection is a list of predicates that dictate how hosts should be selected
    /// when requests are retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_selection: Option<Vec<HostSelectionPredicate>>,

    /// HostSelectionMaxAttempts is the maximum number of times host selection will be
    /// reattempted before giving up, at which point the host that was last selected will
    /// be routed to. If unspecified, this will default to retrying once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_selection_max_attempts: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrpcRetry {
    /// NumRetries is the number of attempts that will be made on failed (and
    /// retriable) requests. If not set, the default value is 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_retries: Option<u32>,

    /// PerTryTimeout is the maximum amount of time each retry attempt can take
    /// before it times out. If not set, the global request timeout for the route
    /// will be used. Setting this value to 0 will disable the per-try timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub per_try_timeout: Option<String>,

    /// BackOff is a configuration of durations which will be used in an exponential
    /// backoff strategy between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_off: Option<BackOff>,

    /// RateLimitedBackOff is a configuration of backoff which will be used when
    /// the upstream returns one of the headers configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limited_back_off: Option<RateLimitedBackOff>,

    /// RetryOn is a list of conditions which will cause a retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on: Option<Vec<GrpcRetryOn>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum GrpcRetryOn {
    Canceled,
    DeadlineExceeded,
    Internal,
    ResourceExhausted,
    Unavailable,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBackOff {
    /// ResetHeaders specifies the list of headers (like Retry-After or X-RateLimit-Reset)
    /// to match against the response. Headers are tried in order, and matched
    /// case-insensitive. The first header to be parsed successfully is used.
    /// If no headers match the default exponential BackOff is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_headers: Option<Vec<ResetHeader>>,

    /// MaxInterval is a maximal amount of time which will be taken between retries.
    /// Default is 300 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub max_interval: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ResetHeader {
    /// The format of the reset header.
    pub format: ResetHeaderFormat,

    /// The Name of the reset header.
    #[schemars(length(min = 1, max = 256))]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ResetHeaderFormat {
    Seconds,
    UnixTimestamp,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostSelectionPredicate {
    /// Type is requested predicate mode.
    pub predicate: HostPredicate,

    /// Tags is a map of metadata to match against for selecting the omitted hosts. Required if Type is
    /// OmitHostsWithTags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<std::collections::BTreeMap<String, String>>,

    /// UpdateFrequency is how often the priority load should be updated based on previously attempted priorities.
    /// Used for OmitPreviousPriorities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_frequency: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum HostPredicate {
    OmitPreviousHosts,
    OmitHostsWithTags,
    OmitPreviousPriorities,
}

impl SpecRules for MeshRetrySpec {}
