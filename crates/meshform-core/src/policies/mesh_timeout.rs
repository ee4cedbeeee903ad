//! MeshTimeout: connection, idle and HTTP timeouts for inbound and outbound traffic

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::SpecRules;
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshTimeout resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshTimeout",
    plural = "meshtimeouts",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshTimeoutSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined inplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// From list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<MeshTimeoutFrom>>,

    /// To list makes a match between the consumed services and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<MeshTimeoutTo>>,

    /// Rules defines inbound timeout configurations. Currently limited to exactly one rule containing
    /// default timeouts that apply to all inbound traffic, as L7 matching is not yet implemented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 1))]
    pub rules: Option<Vec<MeshTimeoutRule>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeshTimeoutFrom {
    /// TargetRef is a reference to the resource that represents a group of
    /// clients.
    pub target_ref: TargetRef,

    /// Default is a configuration specific to the group of clients referenced in
    /// 'targetRef'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TimeoutConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeshTimeoutTo {
    /// TargetRef is a reference to the resource that represents a group of
    /// destinations.
    pub target_ref: TargetRef,

    /// Default is a configuration specific to the group of destinations referenced in
    /// 'targetRef'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TimeoutConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct MeshTimeoutRule {
    pub default: TimeoutConf,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConf {
    /// ConnectionTimeout specifies the amount of time proxy will wait for an TCP connection to be established.
    /// Default value is 5 seconds. Cannot be set to 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub connection_timeout: Option<String>,

    /// IdleTimeout is defined as the period in which there are no bytes sent or received on connection
    /// Setting this timeout to 0 will disable it. Be cautious when disabling it because
    /// it can lead to connection leaking. Default value is 1h.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub idle_timeout: Option<String>,

    /// Protocol specific configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpTimeouts>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpTimeouts {
    /// RequestTimeout The amount of time that proxy will wait for the entire request to be received.
    /// The timer is activated when the request is initiated, and is disarmed when the last byte of the request is sent,
    /// OR when the response is initiated. Setting this timeout to 0 will disable it.
    /// Default is 15s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub request_timeout: Option<String>,

    /// StreamIdleTimeout is the amount of time that proxy will allow a stream to exist with no activity.
    /// Setting this timeout to 0 will disable it. Default is 30m
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub stream_idle_timeout: Option<String>,

    /// MaxStreamDuration is the maximum time that a stream’s lifetime will span.
    /// Setting this timeout to 0 will disable it. Disabled by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub max_stream_duration: Option<String>,

    /// MaxConnectionDuration is the time after which a connection will be drained and/or closed,
    /// starting from when it was first established. Setting this timeout to 0 will disable it.
    /// Disabled by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub max_connection_duration: Option<String>,

    /// RequestHeadersTimeout The amount of time that proxy will wait for the request headers to be received.
    /// The timer is activated when the first byte of the headers is received, and is disarmed when the last byte of
    /// the headers has been received. If not specified or set to 0, this timeout is disabled.
    /// Disabled by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub request_headers_timeout: Option<String>,
}

impl SpecRules for MeshTimeoutSpec {}
