//! Spec validation against the JSON schema generated from the typed structs

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::kind::PolicyKind;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON pointer into the spec, or `(root)`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Convert into an error carrying every issue
    pub fn into_result(self, kind: PolicyKind) -> Result<()> {
        if self.is_valid {
            return Ok(());
        }
        Err(CoreError::SpecValidation {
            kind: kind.kind().to_string(),
            issues: self.errors,
        })
    }
}

/// Checks a typed spec for constraints the schema cannot express.
///
/// Issues use the same JSON pointer paths as schema violations.
pub trait SpecRules {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }
}

/// Run the semantic rules of a typed spec
pub fn check_rules<S: SpecRules>(kind: PolicyKind, spec: &S) -> Result<()> {
    let issues = spec.rule_issues();
    if issues.is_empty() {
        return Ok(());
    }
    ValidationResult::failure(issues).into_result(kind)
}

/// Validator for the spec of one kind, with its compiled schema cached
pub struct SpecValidator {
    kind: PolicyKind,
    compiled: jsonschema::Validator,
}

impl SpecValidator {
    pub fn new(kind: PolicyKind) -> Result<Self> {
        Self::from_schema(kind, &kind.spec_schema())
    }

    /// Compile an arbitrary schema for `kind`
    pub fn from_schema(kind: PolicyKind, schema: &JsonValue) -> Result<Self> {
        let compiled = jsonschema::validator_for(schema).map_err(|e| CoreError::InvalidSchema {
            message: format!("{}: {}", kind, e),
        })?;
        Ok(Self { kind, compiled })
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Validate a spec. Explicit nulls count as absent fields, as they do
    /// for the API server.
    pub fn validate(&self, spec: &JsonValue) -> ValidationResult {
        let spec = &without_nulls(spec);
        if self.compiled.is_valid(spec) {
            return ValidationResult::success();
        }

        let errors = self
            .compiled
            .iter_errors(spec)
            .map(|e| {
                let path = e.instance_path.to_string();
                ValidationIssue {
                    path: if path.is_empty() {
                        "(root)".to_string()
                    } else {
                        path
                    },
                    message: format_validation_error(&e),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }
}

/// Copy of `value` with every null object member removed
fn without_nulls(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

/// Swap the double quotes jsonschema puts around values for single quotes.
///
/// Quotes escaped inside a value (`\"`) belong to the user and are kept.
fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    requote(&error.to_string())
}

fn requote(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                out.push('"');
                chars.next();
            }
            '"' => out.push('\''),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_timeout_spec() {
        let validator = SpecValidator::new(PolicyKind::MeshTimeout).unwrap();
        let spec = json!({
            "targetRef": {"kind": "Mesh"},
            "to": [{
                "targetRef": {"kind": "Mesh"},
                "default": {"connectionTimeout": "5s", "http": {"requestTimeout": "1m30s"}}
            }]
        });
        let result = validator.validate(&spec);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_bad_duration_reports_path() {
        let validator = SpecValidator::new(PolicyKind::MeshTimeout).unwrap();
        let spec = json!({
            "to": [{
                "targetRef": {"kind": "Mesh"},
                "default": {"idleTimeout": "ten seconds"}
            }]
        });
        let result = validator.validate(&spec);
        assert!(!result.is_valid);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.path == "/to/0/default/idleTimeout"),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn test_enum_and_range_violations() {
        let validator = SpecValidator::new(PolicyKind::MeshFaultInjection).unwrap();
        let spec = json!({
            "targetRef": {"kind": "Nope"},
            "from": [{
                "targetRef": {"kind": "Mesh"},
                "default": {"http": [{"abort": {"httpStatus": 700, "percentage": 50}}]}
            }]
        });
        let result = validator.validate(&spec);
        assert!(!result.is_valid);
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"/targetRef/kind"), "{:?}", paths);
        assert!(
            paths.contains(&"/from/0/default/http/0/abort/httpStatus"),
            "{:?}",
            paths
        );
    }

    #[test]
    fn test_root_errors_use_root_path() {
        let validator = SpecValidator::new(PolicyKind::MeshRetry).unwrap();
        let result = validator.validate(&json!("not an object"));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].path, "(root)");
        assert!(!result.errors[0].message.contains('"'));
    }

    #[test]
    fn test_explicit_nulls_count_as_absent() {
        let validator = SpecValidator::new(PolicyKind::MeshTimeout).unwrap();
        let spec = json!({"targetRef": {"kind": "Mesh", "name": null}});
        let result = validator.validate(&spec);
        assert!(result.is_valid, "{:?}", result.errors);

        let spec = json!({
            "to": [{"targetRef": {"kind": "Mesh"}, "default": {"idleTimeout": null}}]
        });
        assert!(validator.validate(&spec).is_valid);

        // a null required field is still missing
        let result = validator.validate(&json!({"targetRef": {"kind": null}}));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].path, "/targetRef");
    }

    #[test]
    fn test_zero_duration_is_valid() {
        let validator = SpecValidator::new(PolicyKind::MeshTimeout).unwrap();
        let spec = json!({
            "to": [{"targetRef": {"kind": "Mesh"}, "default": {"idleTimeout": "0"}}]
        });
        let result = validator.validate(&spec);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_messages_keep_quotes_in_values() {
        let validator = SpecValidator::new(PolicyKind::MeshTrafficPermission).unwrap();
        let spec = json!({
            "from": [{"targetRef": {"kind": "Mesh"}, "default": {"action": "Al\"low"}}]
        });
        let result = validator.validate(&spec);
        assert!(!result.is_valid);
        let message = &result.errors[0].message;
        assert!(message.contains(r#"'Al"low'"#), "{}", message);
    }

    #[test]
    fn test_requote() {
        assert_eq!(requote(r#""10" is not valid"#), "'10' is not valid");
        assert_eq!(requote(r#""a\"b" is not valid"#), r#"'a"b' is not valid"#);
        assert_eq!(requote("no quotes"), "no quotes");
    }

    #[test]
    fn test_check_rules() {
        struct Rules(Vec<ValidationIssue>);
        impl SpecRules for Rules {
            fn rule_issues(&self) -> Vec<ValidationIssue> {
                self.0.clone()
            }
        }

        assert!(check_rules(PolicyKind::MeshRetry, &Rules(vec![])).is_ok());
        let issue = ValidationIssue {
            path: "/to/0".to_string(),
            message: "broken".to_string(),
        };
        let err = check_rules(PolicyKind::MeshRetry, &Rules(vec![issue])).unwrap_err();
        assert_eq!(
            err.to_string(),
            CoreError::SpecValidation {
                kind: "MeshRetry".to_string(),
                issues: vec![ValidationIssue {
                    path: "/to/0".to_string(),
                    message: "broken".to_string(),
                }],
            }
            .to_string()
        );
    }

    #[test]
    fn test_into_result() {
        let validator = SpecValidator::new(PolicyKind::MeshRetry).unwrap();
        let err = validator
            .validate(&json!([]))
            .into_result(PolicyKind::MeshRetry)
            .unwrap_err();
        assert!(err.to_string().contains("(root)"));
        assert!(matches!(err, CoreError::SpecValidation { kind, .. } if kind == "MeshRetry"));
        assert!(validator.validate(&json!({})).into_result(PolicyKind::MeshRetry).is_ok());
    }

    #[test]
    fn test_invalid_schema() {
        let err = SpecValidator::from_schema(PolicyKind::MeshTrace, &json!({"type": 12}));
        assert!(matches!(err, Err(CoreError::InvalidSchema { .. })));
    }

    #[test]
    fn test_every_kind_schema_compiles() {
        for kind in PolicyKind::ALL {
            let validator = SpecValidator::new(*kind).unwrap();
            assert!(validator.validate(&json!({})).is_valid, "{}", kind);
        }
    }
}
