//! MeshHTTPRoute: L7 request matching, filters and traffic splitting

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{HeaderMatch, HeaderModifier, Percentage};
use crate::schema::{SpecRules, ValidationIssue};
use crate::target_ref::{BackendRef, TargetRef};

/// Spec is the specification of the Kuma MeshHTTPRoute resource.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "MeshHTTPRoute",
    root = "MeshHttpRoute",
    plural = "meshhttproutes",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshHttpRouteSpec {
    /// TargetRef is a reference to the resource the policy takes an effect on.
    /// The resource could be either a real store object or virtual resource
    /// defined inplace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,

    /// To matches destination services of requests and holds configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<HttpRouteTo>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteTo {
    /// TargetRef is a reference to the resource that represents a group of
    /// request destinations.
    pub target_ref: TargetRef,

    /// Hostnames is only valid when targeting MeshGateway and limits the
    /// effects of the rules to requests to this hostname.
    /// Given hostnames must intersect with the hostname of the listeners the
    /// route attaches to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<String>>,

    /// Rules contains the routing rules applies to a combination of top-level
    /// targetRef and the targetRef in this entry.
    pub rules: Vec<HttpRouteRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct HttpRouteRule {
    /// Matches describes how to match HTTP requests this rule should be applied
    /// to.
    #[schemars(length(min = 1))]
    pub matches: Vec<HttpRouteMatch>,

    /// Default holds routing rules that can be merged with rules from other
    /// policies.
    pub default: HttpRouteConf,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    /// QueryParams matches based on HTTP URL query parameters. Multiple matches
    /// are ANDed together such that all listed matches must succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<Vec<QueryParamMatch>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<HeaderMatch>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PathMatch {
    #[serde(rename = "type")]
    pub match_type: PathMatchType,

    /// Exact or prefix matches must be an absolute path. A prefix matches only
    /// if separated by a slash or the entire path.
    #[schemars(length(min = 1))]
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum PathMatchType {
    Exact,
    PathPrefix,
    RegularExpression,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct QueryParamMatch {
    #[serde(rename = "type")]
    pub match_type: QueryParamMatchType,

    #[schemars(length(min = 1))]
    pub name: String,

    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum QueryParamMatchType {
    Exact,
    RegularExpression,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteConf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<HttpRouteFilter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_refs: Option<Vec<BackendRef>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteFilter {
    #[serde(rename = "type")]
    pub filter_type: HttpFilterType,

    /// Only one action is supported per header name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_header_modifier: Option<HeaderModifier>,

    /// Only one action is supported per header name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_header_modifier: Option<HeaderModifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_redirect: Option<RequestRedirect>,

    #[serde(default, rename = "urlRewrite", skip_serializing_if = "Option::is_none")]
    pub url_rewrite: Option<UrlRewrite>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_mirror: Option<RequestMirror>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum HttpFilterType {
    RequestHeaderModifier,
    ResponseHeaderModifier,
    RequestRedirect,
    #[serde(rename = "URLRewrite")]
    UrlRewrite,
    RequestMirror,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestRedirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<RedirectScheme>,

    /// PreciseHostname is the fully qualified domain name of a network host. This
    /// matches the RFC 1123 definition of a hostname with 1 notable exception that
    /// numeric IP addresses are not allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1, max = 253))]
    #[schemars(regex(pattern = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$"))]
    pub hostname: Option<String>,

    /// Path defines parameters used to modify the path of the incoming request.
    /// The modified path is then used to construct the location header.
    /// When empty, the request path is used as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathRewrite>,

    /// Port is the port to be used in the value of the `Location`
    /// header in the response.
    /// When empty, port (if specified) of the request is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: Option<u32>,

    /// StatusCode is the HTTP status code to be used in response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<RedirectStatusCode>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RedirectScheme {
    Http,
    Https,
}

/// Redirect status code, restricted to the values Envoy supports
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "u16", into = "u16")]
pub struct RedirectStatusCode(u16);

impl RedirectStatusCode {
    pub const ALLOWED: [u16; 5] = [301, 302, 303, 307, 308];

    pub fn code(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for RedirectStatusCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&code) {
            Ok(Self(code))
        } else {
            Err(format!(
                "redirect status code must be one of {:?}, got {}",
                Self::ALLOWED,
                code
            ))
        }
    }
}

impl From<RedirectStatusCode> for u16 {
    fn from(code: RedirectStatusCode) -> Self {
        code.0
    }
}

impl JsonSchema for RedirectStatusCode {
    fn schema_name() -> String {
        "RedirectStatusCode".to_owned()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(_: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        schemars::schema::SchemaObject {
            instance_type: Some(schemars::schema::InstanceType::Integer.into()),
            enum_values: Some(Self::ALLOWED.iter().map(|c| (*c).into()).collect()),
            ..Default::default()
        }
        .into()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PathRewrite {
    #[serde(rename = "type")]
    pub rewrite_type: PathRewriteType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_full_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_prefix_match: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum PathRewriteType {
    ReplaceFullPath,
    ReplacePrefixMatch,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UrlRewrite {
    /// Hostname is the value to be used to replace the host header value during forwarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1, max = 253))]
    pub hostname: Option<String>,

    /// Path defines a path rewrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathRewrite>,

    /// HostToBackendHostname rewrites the hostname to the hostname of the
    /// upstream host. This option is only available when targeting MeshGateways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_to_backend_hostname: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestMirror {
    /// BackendRef defines where to forward traffic.
    pub backend_ref: BackendRef,

    /// Percentage of requests to mirror. If not specified, all requests
    /// to the target cluster will be mirrored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Percentage>,
}

impl SpecRules for MeshHttpRouteSpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (i, to) in self.to.iter().flatten().enumerate() {
            for (j, rule) in to.rules.iter().enumerate() {
                for (k, filter) in rule.default.filters.iter().flatten().enumerate() {
                    let percentage = filter
                        .request_mirror
                        .as_ref()
                        .and_then(|mirror| mirror.percentage.as_ref());
                    issues.extend(percentage.and_then(|p| {
                        p.range_issue(format!(
                            "/to/{}/rules/{}/default/filters/{}/requestMirror/percentage",
                            i, j, k
                        ))
                    }));
                }
            }
        }
        issues
    }
}
