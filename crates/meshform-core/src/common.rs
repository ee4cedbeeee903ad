//! Value types shared by several policy kinds

use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::{Schema, SchemaObject};
use serde::{Deserialize, Serialize};

use crate::schema::ValidationIssue;

/// Go-style duration string, e.g. `10s`, `1m30s`, `250ms`, or a bare `0`
pub const DURATION_PATTERN: &str = r"^(0|([0-9]+(\.[0-9]+)?(ns|us|µs|ms|s|m|h))+)$";

/// A percentage expressed either as an integer or as a decimal string
/// (`50`, `"12.5"`), matching the int-or-string fields of the Kuma CRDs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Percentage {
    Int(i64),
    Str(String),
}

impl Percentage {
    /// Numeric value of the percentage, if it parses
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Percentage::Int(i) => Some(*i as f64),
            Percentage::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Whether the value lies within `0..=100`
    pub fn is_in_range(&self) -> bool {
        self.as_f64().is_some_and(|v| (0.0..=100.0).contains(&v))
    }

    /// Issue at `path` when the value is not a number within `0..=100`
    pub fn range_issue(&self, path: String) -> Option<ValidationIssue> {
        if self.is_in_range() {
            return None;
        }
        let message = match self.as_f64() {
            Some(v) => format!("{} is not between 0 and 100", v),
            None => "must be a number between 0 and 100".to_string(),
        };
        Some(ValidationIssue { path, message })
    }
}

impl JsonSchema for Percentage {
    fn schema_name() -> String {
        "Percentage".to_owned()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(_: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            extensions: [(
                "x-kubernetes-int-or-string".to_owned(),
                serde_json::Value::Bool(true),
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        }
        .into()
    }
}

/// Exponential back-off settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackOff {
    /// BaseInterval is an amount of time which should be taken between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub base_interval: Option<String>,

    /// MaxInterval is a maximal amount of time which will be taken between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(path = "crate::common::DURATION_PATTERN"))]
    pub max_interval: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum HeaderMatchType {
    Exact,
    Present,
    RegularExpression,
    Absent,
    Prefix,
}

/// Describes how to select an HTTP route by matching HTTP request headers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<HeaderMatchType>,

    /// Name is the name of the HTTP Header to be matched. Name MUST be lower case
    /// as they will be handled with case insensitivity.
    #[schemars(length(min = 1, max = 256))]
    #[schemars(regex(pattern = r"^[a-z0-9!#$%&'*+\-.^_\x60|~]+$"))]
    pub name: String,

    /// Value is the value of HTTP Header to be matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct HeaderValue {
    #[schemars(length(min = 1, max = 256))]
    #[schemars(regex(pattern = r"^[a-z0-9!#$%&'*+\-.^_\x60|~]+$"))]
    pub name: String,
    pub value: String,
}

/// Only one action is supported per header name.
/// Configuration to set or add multiple values for a header must use RFC 7230
/// header value formatting, separating each value with a comma.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct HeaderModifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 16))]
    pub add: Option<Vec<HeaderValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 16))]
    pub set: Option<Vec<HeaderValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 16))]
    pub remove: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_duration_pattern() {
        let re = Regex::new(DURATION_PATTERN).unwrap();
        for ok in ["0", "0s", "10s", "1m30s", "250ms", "1.5h", "100us"] {
            assert!(re.is_match(ok), "{ok} should match");
        }
        for bad in ["", "10", "00", "0 s", "ten seconds", "5d", "-1s"] {
            assert!(!re.is_match(bad), "{bad} should not match");
        }
    }

    #[test]
    fn test_percentage_int_or_string() {
        let int: Percentage = serde_json::from_str("50").unwrap();
        assert_eq!(int, Percentage::Int(50));
        assert!(int.is_in_range());

        let s: Percentage = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(s.as_f64(), Some(12.5));

        assert!(!Percentage::Int(101).is_in_range());
        assert!(!Percentage::Str("abc".to_string()).is_in_range());
    }

    #[test]
    fn test_percentage_range_issue() {
        assert_eq!(Percentage::Str("99.9".to_string()).range_issue("/p".into()), None);

        let issue = Percentage::Int(250).range_issue("/p".into()).unwrap();
        assert_eq!(issue.path, "/p");
        assert_eq!(issue.message, "250 is not between 0 and 100");

        let issue = Percentage::Str("half".to_string()).range_issue("/p".into()).unwrap();
        assert_eq!(issue.message, "must be a number between 0 and 100");
    }

    #[test]
    fn test_percentage_schema_is_int_or_string() {
        let schema = schemars::schema_for!(Percentage);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["x-kubernetes-int-or-string"], true);
    }

    #[test]
    fn test_header_match_type_field_name() {
        let m = HeaderMatch {
            match_type: Some(HeaderMatchType::Exact),
            name: "x-env".to_string(),
            value: Some("prod".to_string()),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "Exact");
        assert!(json.get("matchType").is_none());
    }
}
