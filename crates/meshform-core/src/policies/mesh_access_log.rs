//! MeshAccessLog: where and how proxies write access logs

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::SpecRules;
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshAccessLog resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshAccessLog",
    plural = "meshaccesslogs",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshAccessLogSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined in-place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// From list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<AccessLogTarget>>,

    /// To list makes a match between the consumed services and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<AccessLogTarget>>,

    /// Rules defines inbound access log configurations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AccessLogRule>>,
}

/// An entry of `from` or `to`; both carry the same shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogTarget {
    /// TargetRef is a reference to the resource that represents a group of
    /// clients or destinations.
    pub target_ref: TargetRef,

    /// Default is a configuration specific to the group of clients or
    /// destinations referenced in 'targetRef'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<AccessLogConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AccessLogRule {
    pub default: AccessLogConf,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct AccessLogConf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backends: Option<Vec<AccessLogBackend>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogBackend {
    /// FileBackend defines configuration for file based access logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileBackend>,

    /// TCPBackend defines a TCP logging backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpBackend>,

    /// Defines an OpenTelemetry logging backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_telemetry: Option<OtelBackend>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct FileBackend {
    /// Path to a file that logs will be written to
    #[schemars(length(min = 1))]
    pub path: String,

    /// Format of access logs. Placeholders available on
    /// https://www.envoyproxy.io/docs/envoy/latest/configuration/observability/access_log/usage#command-operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TcpBackend {
    /// Address of the TCP logging backend
    #[schemars(length(min = 1))]
    pub address: String,

    /// Format of access logs. Placeholders available on
    /// https://www.envoyproxy.io/docs/envoy/latest/configuration/observability/access_log/usage#command-operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct OtelBackend {
    /// Endpoint of OpenTelemetry collector. An empty port defaults to 4317.
    #[schemars(length(min = 1))]
    pub endpoint: String,

    /// Body is a raw string or an OTLP any value as described at
    /// https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/logs/data-model.md#field-body
    /// It can contain placeholders available on
    /// https://www.envoyproxy.io/docs/envoy/latest/configuration/observability/access_log/usage#command-operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Attributes can contain placeholders available on
    /// https://www.envoyproxy.io/docs/envoy/latest/configuration/observability/access_log/usage#command-operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
}

/// Format of access logs.
///
/// Exactly one of `plain` or `json` is set, matching `type`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogFormat {
    #[serde(rename = "type")]
    pub format_type: LogFormatType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Vec<KeyValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omit_empty_values: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum LogFormatType {
    Plain,
    Json,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl LogFormat {
    /// Whether the payload matching `type` is present
    pub fn is_consistent(&self) -> bool {
        match self.format_type {
            LogFormatType::Plain => self.plain.is_some() && self.json.is_none(),
            LogFormatType::Json => self.json.is_some() && self.plain.is_none(),
        }
    }
}

impl SpecRules for MeshAccessLogSpec {}
