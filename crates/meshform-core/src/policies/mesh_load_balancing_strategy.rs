//! MeshLoadBalancingStrategy: load balancer algorithms and locality awareness

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::Percentage;
use crate::schema::{SpecRules, ValidationIssue};
use crate::target_ref::TargetRef;

/// Spec is the specification of the Kuma MeshLoadBalancingStrategy resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshLoadBalancingStrategy",
    plural = "meshloadbalancingstrategies",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshLoadBalancingStrategySpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined inplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// To list makes a match between the consumed services and corresponding configurations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<LoadBalancingTo>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingTo {
    pub target_ref: TargetRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<LoadBalancingConf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingConf {
    /// LocalityAwareness contains configuration for locality aware load balancing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality_awareness: Option<LocalityAwareness>,

    /// LoadBalancer allows to specify load balancing algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<LoadBalancer>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalityAwareness {
    /// Disabled allows to disable locality-aware load balancing.
    /// When disabled requests are distributed across all endpoints regardless of locality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// LocalZone defines locality aware load balancing within a zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_zone: Option<LocalZone>,

    /// CrossZone defines locality aware load balancing priorities between dataplane proxies in different zones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_zone: Option<CrossZone>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalZone {
    /// AffinityTags list of tags for local zone load balancing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_tags: Option<Vec<AffinityTag>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AffinityTag {
    /// Key defines tag for which affinity is configured
    pub key: String,

    /// Weight of the tag used for load balancing. The bigger the weight the bigger the priority.
    /// Percentage of local traffic load balanced to tag is computed by dividing weight by sum of weights from all tags.
    /// For example with two affinity tags first with weight 80 and second with weight 20,
    /// then 80% of traffic will be redirected to the first tag, and 20% of traffic will be redirected to second one.
    /// Setting weights is not mandatory. When weights are not set control plane will compute default weight based on list order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrossZone {
    /// Failover defines list of load balancing rules in order of priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover: Option<Vec<Failover>>,

    /// FailoverThreshold defines the percentage of live destination dataplane proxies below which load balancing to the
    /// next priority starts.
    /// Example: If you configure failoverThreshold to 70, and you have deployed 10 destination dataplane proxies.
    /// Load balancing to next priority will start when number of live destination dataplane proxies drops below 7.
    /// Default 50
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_threshold: Option<FailoverThreshold>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct FailoverThreshold {
    pub percentage: Percentage,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Failover {
    /// From defines the list of zones to which the rule applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FailoverFrom>,

    /// To defines to which zones the traffic should be load balanced
    pub to: FailoverTo,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct FailoverFrom {
    pub zones: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct FailoverTo {
    /// Type defines how target zones will be picked from available zones
    #[serde(rename = "type")]
    pub to_type: FailoverToType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum FailoverToType {
    None,
    Only,
    Any,
    AnyExcept,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    #[serde(rename = "type")]
    pub lb_type: LoadBalancerType,

    /// RoundRobin is a load balancing algorithm that distributes requests
    /// across available upstream hosts in round-robin order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_robin: Option<std::collections::BTreeMap<String, serde_json::Value>>,

    /// LeastRequest selects N random available hosts as specified in 'choiceCount' (2 by default)
    /// and picks the host which has the fewest active requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub least_request: Option<LeastRequest>,

    /// RingHash  implements consistent hashing to upstream hosts. Each host is mapped
    /// onto a circle (the "ring") by hashing its address; each request is then routed
    /// to a host by hashing some property of the request, and finding the nearest
    /// corresponding host clockwise around the ring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ring_hash: Option<RingHash>,

    /// Random selects a random available host. The random load balancer generally
    /// performs better than round-robin if no health checking policy is configured.
    /// Random selection avoids bias towards the host in the set that comes after a failed host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random: Option<std::collections::BTreeMap<String, serde_json::Value>>,

    /// Maglev implements consistent hashing to upstream hosts. Maglev can be used as
    /// a drop in replacement for the ring hash load balancer any place in which
    /// consistent hashing is desired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maglev: Option<Maglev>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum LoadBalancerType {
    RoundRobin,
    LeastRequest,
    RingHash,
    Random,
    Maglev,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeastRequest {
    /// ChoiceCount is the number of random healthy hosts from which
    /// the host with the fewest active requests will be chosen.
    /// Defaults to 2 so that Envoy performs two-choice selection if the field is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 2))]
    pub choice_count: Option<u32>,

    /// ActiveRequestBias refers to dynamic weights applied when hosts have varying load
    /// balancing weights. A higher value here aggressively reduces the weight of endpoints
    /// that are currently handling active requests. In essence, the higher the ActiveRequestBias
    /// value, the more forcefully it reduces the load balancing weight of endpoints that are
    /// actively serving requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_request_bias: Option<Percentage>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RingHash {
    /// HashFunction is a function used to hash hosts onto the ketama ring.
    /// The value defaults to XX_HASH. Available values – XX_HASH, MURMUR_HASH_2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_function: Option<HashFunction>,

    /// Minimum hash ring size. The larger the ring is (that is,
    /// the more hashes there are for each provided host) the better the request distribution
    /// will reflect the desired weights. Defaults to 1024 entries, and limited to 8M entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 8_000_000))]
    pub min_ring_size: Option<u32>,

    /// Maximum hash ring size. Defaults to 8M entries, and limited to 8M entries,
    /// but can be lowered to further constrain resource use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 8_000_000))]
    pub max_ring_size: Option<u32>,

    /// HashPolicies specify a list of request/connection properties that are used to calculate a hash.
    /// These hash policies are executed in the specified order. If a hash policy has the “terminal” attribute
    /// set to true, and there is already a hash generated, the hash is returned immediately,
    /// ignoring the rest of the hash policy list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_policies: Option<Vec<HashPolicy>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum HashFunction {
    XXHash,
    MurmurHash2,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Maglev {
    /// The table size for Maglev hashing. Maglev aims for “minimal disruption”
    /// rather than an absolute guarantee. The table size must be prime number limited to 5000011.
    /// If it is not specified, the default is 65537.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 5_000_011))]
    pub table_size: Option<u32>,

    /// HashPolicies specify a list of request/connection properties that are used to calculate a hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_policies: Option<Vec<HashPolicy>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HashPolicy {
    #[serde(rename = "type")]
    pub policy_type: HashPolicyType,

    /// Terminal is a flag that short-circuits the hash computing. This field provides
    /// a ‘fallback’ style of configuration: “if a terminal policy doesn’t work, fallback
    /// to rest of the policy list”, it saves time when the terminal policy works.
    /// If true, and there is already a hash computed, ignore rest of the list of hash polices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<NamedHashSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<CookieHash>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionHash>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameter: Option<NamedHashSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_state: Option<FilterStateHash>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum HashPolicyType {
    Header,
    Cookie,
    Connection,
    #[serde(rename = "SourceIP")]
    SourceIp,
    QueryParameter,
    FilterState,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct NamedHashSource {
    /// The name of the request header or URL query parameter that will be used to obtain the hash key.
    #[schemars(length(min = 1))]
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct CookieHash {
    /// The name of the cookie that will be used to obtain the hash key.
    #[schemars(length(min = 1))]
    pub name: String,

    /// If specified, a cookie with the TTL will be generated if the cookie is not present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// The name of the path for the cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHash {
    /// Hash on source IP address.
    #[serde(default, rename = "sourceIP", skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct FilterStateHash {
    /// The name of the Object in the per-request filterState, which is
    /// an Envoy::Hashable object. If there is no data associated with the key,
    /// or the stored object is not Envoy::Hashable, no hash will be produced.
    #[schemars(length(min = 1))]
    pub key: String,
}

impl SpecRules for MeshLoadBalancingStrategySpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        self.to
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, to)| {
                let locality = to.default.as_ref()?.locality_awareness.as_ref()?;
                let threshold = locality.cross_zone.as_ref()?.failover_threshold.as_ref()?;
                threshold.percentage.range_issue(format!(
                    "/to/{}/default/localityAwareness/crossZone/failoverThreshold/percentage",
                    i
                ))
            })
            .collect()
    }
}
