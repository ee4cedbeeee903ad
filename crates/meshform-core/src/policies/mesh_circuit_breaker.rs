//! MeshCircuitBreaker: connection limits and outlier detection

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Percentage;
use crate::schema::{SpecRules, ValidationIssue};
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshCircuitBreaker resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshCircuitBreaker",
    plural = "meshcircuitbreakers",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshCircuitBreakerSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// From list makes a match between clients and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<CircuitBreakerTarget>>,

    /// To list makes a match between the consumed services and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<CircuitBreakerTarget>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerTarget {
    pub target_ref: TargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<CircuitBreakerConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerConf {
    /// ConnectionLimits contains configuration of each circuit breaking limit,
    /// which when exceeded makes the circuit breaker to become open (no traffic
    /// is allowed like no current is allowed in the circuits when physical
    /// circuit breaker ir open)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_limits: Option<ConnectionLimits>,

    /// OutlierDetection contains the configuration of the process of dynamically
    /// determining whether some number of hosts in an upstream cluster are
    /// performing unlike the others and removing them from the healthy load
    /// balancing set. Performance might be along different axes such as
    /// consecutive failures, temporal success rate, temporal latency, etc.
    /// Outlier detection is a form of passive health checking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlier_detection: Option<OutlierDetection>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionLimits {
    /// The maximum number of connection pools per cluster that are concurrently
    /// supported at once. Set this for clusters which create a large number of
    /// connection pools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connection_pools: Option<u32>,

    /// The maximum number of connections allowed to be made to the upstream
    /// cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,

    /// The maximum number of pending requests that are allowed to the upstream
    /// cluster. This limit is applied as a connection limit for non-HTTP
    /// traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pending_requests: Option<u32>,

    /// The maximum number of parallel requests that are allowed to be made
    /// to the upstream cluster. This limit does not apply to non-HTTP traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<u32>,

    /// The maximum number of parallel retries that will be allowed to
    /// the upstream cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutlierDetection {
    /// When set to true, outlierDetection configuration won't take any effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// The time interval between ejection analysis sweeps. This can result in
    /// both new ejections and hosts being returned to service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub interval: Option<String>,

    /// The base time that a host is ejected for. The real time is equal to
    /// the base time multiplied by the number of times the host has been
    /// ejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub base_ejection_time: Option<String>,

    /// The maximum % of an upstream cluster that can be ejected due to outlier
    /// detection. Defaults to 10% but will eject at least one host regardless of
    /// the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 100))]
    pub max_ejection_percent: Option<u32>,

    /// Determines whether to distinguish local origin failures from external
    /// errors. If set to true the following configuration parameters are taken
    /// into account: detectors.localOriginFailures.consecutive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_external_and_local_errors: Option<bool>,

    /// Contains configuration for supported outlier detectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detectors: Option<Detectors>,

    /// Determines whether to bypass outlier detection in panic mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_panic_threshold: Option<Percentage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Detectors {
    /// In the default mode (outlierDetection.splitExternalAndLocalErrors is
    /// false) this detection type takes into account all generated errors:
    /// locally originated and externally originated (transaction) errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_failures: Option<ConsecutiveFailures>,

    /// This detection type takes into account a subset of 5xx errors, called
    /// "gateway errors" (502, 503 or 504 status code) and local origin failures,
    /// such as timeout, TCP reset etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_failures: Option<ConsecutiveFailures>,

    /// This detection type is enabled only when
    /// outlierDetection.splitExternalAndLocalErrors is true and takes into
    /// account only locally originated errors (timeout, reset, etc).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_origin_failures: Option<ConsecutiveFailures>,

    /// Success Rate based outlier detection aggregates success rate data from
    /// every host in a cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<SuccessRateDetector>,

    /// Failure Percentage based outlier detection functions similarly to success
    /// rate detection, in that it relies on success rate data from each host in
    /// a cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_percentage: Option<FailurePercentageDetector>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ConsecutiveFailures {
    /// The number of consecutive failures before an ejection occurs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRateDetector {
    /// The number of hosts in a cluster that must have enough request volume to
    /// detect success rate outliers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_hosts: Option<u32>,

    /// The minimum number of total requests that must be collected in one
    /// interval (as defined by the interval duration configured in
    /// outlierDetection section) to include this host in success rate based
    /// outlier detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_volume: Option<u32>,

    /// This factor is used to determine the ejection threshold for success rate
    /// outlier ejection. Either int or decimal represented as string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_deviation_factor: Option<Percentage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailurePercentageDetector {
    /// The minimum number of hosts in a cluster in order to perform failure
    /// percentage-based ejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_hosts: Option<u32>,

    /// The minimum number of total requests that must be collected in one
    /// interval to perform failure percentage-based ejection for this host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_volume: Option<u32>,

    /// The failure percentage to use when determining failure percentage-based
    /// outlier detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 100))]
    pub threshold: Option<u32>,
}

impl SpecRules for MeshCircuitBreakerSpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (field, targets) in [("from", &self.from), ("to", &self.to)] {
            issues.extend(targets.iter().flatten().enumerate().filter_map(|(i, target)| {
                let outlier = target.default.as_ref()?.outlier_detection.as_ref()?;
                outlier.healthy_panic_threshold.as_ref()?.range_issue(format!(
                    "/{}/{}/default/outlierDetection/healthyPanicThreshold",
                    field, i
                ))
            }));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmarshal_circuit_breaker() {
        let json = serde_json::json!({
            "targetRef": {"kind": "Mesh"},
            "to": [{
                "targetRef": {"kind": "Mesh"},
                "default": {
                    "connectionLimits": {"maxConnections": 2, "maxPendingRequests": 8},
                    "outlierDetection": {
                        "disabled": false,
                        "interval": "5s",
                        "maxEjectionPercent": 20,
                        "detectors": {
                            "totalFailures": {"consecutive": 10},
                            "successRate": {"minimumHosts": 5, "standardDeviationFactor": "1.9"}
                        }
                    }
                }
            }]
        });

        let spec: MeshCircuitBreakerSpec = serde_json::from_value(json).unwrap();
        let conf = spec.to.unwrap().remove(0).default.unwrap();
        let limits = conf.connection_limits.unwrap();
        assert_eq!(limits.max_connections, Some(2));
        assert_eq!(limits.max_pending_requests, Some(8));
        assert!(limits.max_retries.is_none());

        let od = conf.outlier_detection.unwrap();
        assert_eq!(od.max_ejection_percent, Some(20));
        let detectors = od.detectors.unwrap();
        assert_eq!(detectors.total_failures.unwrap().consecutive, Some(10));
        assert_eq!(
            detectors.success_rate.unwrap().standard_deviation_factor,
            Some(Percentage::Str("1.9".to_string()))
        );
    }

    #[test]
    fn test_panic_threshold_range() {
        let spec: MeshCircuitBreakerSpec = serde_json::from_value(serde_json::json!({
            "from": [{
                "targetRef": {"kind": "Mesh"},
                "default": {"outlierDetection": {
                    "healthyPanicThreshold": 101,
                    "detectors": {"successRate": {"standardDeviationFactor": 190}}
                }}
            }]
        }))
        .unwrap();

        let issues = spec.rule_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].path,
            "/from/0/default/outlierDetection/healthyPanicThreshold"
        );
    }
}
