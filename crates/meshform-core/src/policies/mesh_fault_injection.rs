//! MeshFaultInjection: abort, delay and bandwidth faults for HTTP traffic

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Percentage;
use crate::schema::{SpecRules, ValidationIssue};
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshFaultInjection resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshFaultInjection",
    plural = "meshfaultinjections",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshFaultInjectionSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// From list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<FaultInjectionTarget>>,

    /// To list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<FaultInjectionTarget>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaultInjectionTarget {
    pub target_ref: TargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FaultInjectionConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct FaultInjectionConf {
    /// Http allows to define list of Http faults between dataplanes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<Vec<HttpFault>>,
}

/// FaultInjection defines the configuration of faults between dataplanes.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpFault {
    /// Abort defines a configuration of not delivering requests to destination
    /// service and replacing the responses from destination dataplane by
    /// predefined status code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<AbortFault>,

    /// Delay defines configuration of delaying a response from a destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayFault>,

    /// ResponseBandwidth defines a configuration to limit the speed of
    /// responding to the requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_bandwidth: Option<ResponseBandwidthFault>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AbortFault {
    /// HTTP status code which will be returned to source side
    #[schemars(range(min = 100, max = 599))]
    pub http_status: i32,

    /// Percentage of requests on which abort will be injected, has to be
    /// either int or decimal represented as string.
    pub percentage: Percentage,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct DelayFault {
    /// Percentage of requests on which delay will be injected, has to be
    /// either int or decimal represented as string.
    pub percentage: Percentage,

    /// The duration during which the response will be delayed
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ResponseBandwidthFault {
    /// Limit is represented by value measure in Gbps, Mbps, kbps, e.g.
    /// 10kbps
    #[schemars(regex(pattern = r"^[0-9]+(kbps|Mbps|Gbps)$"))]
    pub limit: String,

    /// Percentage of requests on which response bandwidth limit will be
    /// either int or decimal represented as string.
    pub percentage: Percentage,
}

impl SpecRules for MeshFaultInjectionSpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (field, targets) in [("from", &self.from), ("to", &self.to)] {
            for (i, target) in targets.iter().flatten().enumerate() {
                let faults = target.default.as_ref().and_then(|conf| conf.http.as_ref());
                for (j, fault) in faults.into_iter().flatten().enumerate() {
                    let percentages = [
                        ("abort", fault.abort.as_ref().map(|f| &f.percentage)),
                        ("delay", fault.delay.as_ref().map(|f| &f.percentage)),
                        (
                            "responseBandwidth",
                            fault.response_bandwidth.as_ref().map(|f| &f.percentage),
                        ),
                    ];
                    issues.extend(percentages.into_iter().filter_map(|(name, percentage)| {
                        percentage?.range_issue(format!(
                            "/{}/{}/default/http/{}/{}/percentage",
                            field, i, j, name
                        ))
                    }));
                }
            }
        }
        issues
    }
}
