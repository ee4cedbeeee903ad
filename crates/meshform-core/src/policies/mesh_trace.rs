//! MeshTrace: tracing backends, sampling and span tags

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Percentage;
use crate::schema::{SpecRules, ValidationIssue};
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshTrace resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshTrace",
    plural = "meshtraces",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshTraceSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// MeshTrace configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TraceConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TraceConf {
    /// A one element array of backend definition.
    /// Envoy allows configuring only 1 backend, so the natural way of
    /// representing that would be just one object. Unfortunately due to the
    /// reasons explained in MADR 009-tracing-policy this has to be a one element
    /// array for now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 1))]
    pub backends: Option<Vec<TraceBackend>>,

    /// Sampling configuration.
    /// Sampling is the process by which a decision is made on whether to
    /// process/export a span or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Sampling>,

    /// Custom tags configuration. You can add custom tags to traces based on
    /// headers or literal values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TraceTag>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TraceBackend {
    #[serde(rename = "type")]
    pub backend_type: TraceBackendType,

    /// Zipkin backend configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipkin: Option<ZipkinBackend>,

    /// Datadog backend configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datadog: Option<DatadogBackend>,

    /// OpenTelemetry backend configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_telemetry: Option<OpenTelemetryBackend>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum TraceBackendType {
    Zipkin,
    Datadog,
    OpenTelemetry,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZipkinBackend {
    /// Address of Zipkin collector.
    pub url: String,

    /// Generate 128bit traces.
    #[serde(default, rename = "traceId128bit", skip_serializing_if = "Option::is_none")]
    pub trace_id_128bit: Option<bool>,

    /// Version of the API.
    /// https://github.com/envoyproxy/envoy/blob/v1.22.0/api/envoy/config/trace/v3/zipkin.proto#L66
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<ZipkinApiVersion>,

    /// Determines whether client and server spans will share the same span
    /// context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_span_context: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ZipkinApiVersion {
    HttpJson,
    HttpProto,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatadogBackend {
    /// Address of Datadog collector, only host and port are allowed (no paths,
    /// fragments etc.)
    pub url: String,

    /// Determines if datadog service name should be split based on traffic
    /// direction and destination. For example, with `splitService: true` and a
    /// `backend` service that communicates with a couple of databases, you would
    /// get service names like `backend_INBOUND`, `backend_OUTBOUND_db1`, and
    /// `backend_OUTBOUND_db2` in Datadog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_service: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct OpenTelemetryBackend {
    /// Address of OpenTelemetry collector.
    #[schemars(length(min = 1))]
    pub endpoint: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Sampling {
    /// Target percentage of requests that will be force traced if the
    /// 'x-client-trace-id' header is set. Mirror of client_sampling in Envoy
    /// https://github.com/envoyproxy/envoy/blob/v1.22.0/api/envoy/config/filter/network/http_connection_manager/v2/http_connection_manager.proto#L127-L133
    /// Either int or decimal represented as string.
    /// If not specified then the default value is 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Percentage>,

    /// Target percentage of requests will be traced
    /// after all other sampling checks have been applied (client, force tracing,
    /// random sampling). This field functions as an upper limit on the total
    /// configured sampling rate. For instance, setting client_sampling to 100%
    /// but overall_sampling to 1% will result in only 1% of client requests with
    /// the appropriate headers to be force traced. Mirror of
    /// overall_sampling in Envoy
    /// https://github.com/envoyproxy/envoy/blob/v1.22.0/api/envoy/config/filter/network/http_connection_manager/v2/http_connection_manager.proto#L142-L150
    /// Either int or decimal represented as string.
    /// If not specified then the default value is 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<Percentage>,

    /// Target percentage of requests that will be randomly selected for trace
    /// generation, if not requested by the client or not forced.
    /// Mirror of random_sampling in Envoy
    /// https://github.com/envoyproxy/envoy/blob/v1.22.0/api/envoy/config/filter/network/http_connection_manager/v2/http_connection_manager.proto#L135-L140
    /// Either int or decimal represented as string.
    /// If not specified then the default value is 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random: Option<Percentage>,
}

/// Custom tag configuration.
///
/// Only one of literal or header can be defined.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TraceTag {
    /// Name of the tag.
    pub name: String,

    /// Tag taken from literal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,

    /// Tag taken from a header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<TagHeader>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TagHeader {
    /// Name of the header.
    pub name: String,

    /// Default value to use if header is missing.
    /// If the default is missing and there is no value the tag will not be
    /// included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl SpecRules for MeshTraceSpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        let Some(sampling) = self.default.as_ref().and_then(|conf| conf.sampling.as_ref()) else {
            return Vec::new();
        };
        [
            ("client", &sampling.client),
            ("overall", &sampling.overall),
            ("random", &sampling.random),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()?
                .range_issue(format!("/default/sampling/{}", name))
        })
        .collect()
    }
}
