//! MeshRateLimit: local HTTP request and TCP connection rate limits

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::HeaderModifier;
use crate::schema::SpecRules;
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshRateLimit resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshRateLimit",
    plural = "meshratelimits",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshRateLimitSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined inplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// From list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<RateLimitTarget>>,

    /// To list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<RateLimitTarget>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitTarget {
    pub target_ref: TargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RateLimitConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct RateLimitConf {
    /// LocalConf defines local http or/and tcp rate limit configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalRateLimit>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct LocalRateLimit {
    /// LocalHTTP defines configuration of local HTTP rate limiting
    /// https://www.envoyproxy.io/docs/envoy/latest/configuration/http/http_filters/local_rate_limit_filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<LocalHttpRateLimit>,

    /// LocalTCP defines confguration of local TCP rate limiting
    /// https://www.envoyproxy.io/docs/envoy/latest/configuration/listeners/network_filters/local_rate_limit_filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<LocalTcpRateLimit>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalHttpRateLimit {
    /// Define if rate limiting should be disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Defines how many requests are allowed per interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_rate: Option<Rate>,

    /// Describes the actions to take on a rate limit event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_rate_limit: Option<OnRateLimit>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalTcpRateLimit {
    /// Define if rate limiting should be disabled.
    /// Default: false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Defines how many connections are allowed per interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_rate: Option<Rate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Rate {
    /// Number of units per interval (depending on usage it can be a number of requests,
    /// or a number of connections).
    #[schemars(range(min = 1))]
    pub num: u32,

    /// The interval the number of units is accounted for.
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub interval: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct OnRateLimit {
    /// The HTTP status code to be set on a rate limit event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u32>,

    /// The Headers to be added to the HTTP response on a rate limit event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderModifier>,
}

impl SpecRules for MeshRateLimitSpec {}
