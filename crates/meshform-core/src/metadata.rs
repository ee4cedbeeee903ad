//! Object metadata and the Kubernetes naming rules that apply to it

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const DNS_SUBDOMAIN_MAX: usize = 253;
const DNS_LABEL_MAX: usize = 63;
const QUALIFIED_NAME_MAX: usize = 63;
const LABEL_VALUE_MAX: usize = 63;

static DNS_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid regex")
});

static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("valid regex")
});

/// Identity and decoration of a policy object
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub name: String,

    pub namespace: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl ObjectMetadata {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: None,
            annotations: None,
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// `namespace/name`, the identifier used in state and for import
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Check every field against the Kubernetes naming rules
    pub fn validate(&self) -> Result<()> {
        match self.errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every naming rule violation, in field order
    pub fn errors(&self) -> Vec<CoreError> {
        let mut checks = vec![validate_name(&self.name), validate_namespace(&self.namespace)];

        if let Some(labels) = &self.labels {
            for (key, value) in labels {
                checks.push(validate_label_key(key));
                checks.push(validate_label_value(key, value));
            }
        }

        if let Some(annotations) = &self.annotations {
            checks.extend(annotations.keys().map(|key| validate_annotation_key(key)));
        }

        checks.into_iter().filter_map(|check| check.err()).collect()
    }

    /// Copy the fields the provider manages out of a server object.
    ///
    /// Empty label and annotation maps are reported as absent.
    pub fn from_object_meta(meta: &ObjectMeta) -> Result<Self> {
        let name = meta.name.clone().ok_or_else(|| CoreError::MissingField {
            field: "metadata.name".to_string(),
        })?;
        let namespace = meta.namespace.clone().ok_or_else(|| CoreError::MissingField {
            field: "metadata.namespace".to_string(),
        })?;

        Ok(Self {
            name,
            namespace,
            labels: meta.labels.clone().filter(|m| !m.is_empty()),
            annotations: meta.annotations.clone().filter(|m| !m.is_empty()),
        })
    }

    pub fn to_object_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            ..Default::default()
        }
    }
}

impl From<&ObjectMetadata> for ObjectMeta {
    fn from(meta: &ObjectMetadata) -> Self {
        meta.to_object_meta()
    }
}

/// Object names are DNS subdomains
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::metadata("metadata.name", "must not be empty"));
    }
    if name.len() > DNS_SUBDOMAIN_MAX {
        return Err(CoreError::metadata(
            "metadata.name",
            format!("must be no more than {} characters", DNS_SUBDOMAIN_MAX),
        ));
    }
    if !DNS_SUBDOMAIN.is_match(name) {
        return Err(CoreError::metadata(
            "metadata.name",
            format!(
                "'{}' must consist of lower case alphanumeric characters, '-' or '.', \
                 and must start and end with an alphanumeric character",
                name
            ),
        ));
    }
    Ok(())
}

/// Namespaces are DNS labels
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(CoreError::metadata("metadata.namespace", "must not be empty"));
    }
    if namespace.len() > DNS_LABEL_MAX {
        return Err(CoreError::metadata(
            "metadata.namespace",
            format!("must be no more than {} characters", DNS_LABEL_MAX),
        ));
    }
    if !DNS_LABEL.is_match(namespace) {
        return Err(CoreError::metadata(
            "metadata.namespace",
            format!(
                "'{}' must consist of lower case alphanumeric characters or '-', \
                 and must start and end with an alphanumeric character",
                namespace
            ),
        ));
    }
    Ok(())
}

pub fn validate_label_key(key: &str) -> Result<()> {
    validate_qualified_key("metadata.labels", key)
}

pub fn validate_annotation_key(key: &str) -> Result<()> {
    validate_qualified_key("metadata.annotations", key)
}

/// Label values may be empty; otherwise they follow the qualified name rules
pub fn validate_label_value(key: &str, value: &str) -> Result<()> {
    let field = format!("metadata.labels[{}]", key);
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > LABEL_VALUE_MAX {
        return Err(CoreError::metadata(
            field,
            format!("must be no more than {} characters", LABEL_VALUE_MAX),
        ));
    }
    if !QUALIFIED_NAME.is_match(value) {
        return Err(CoreError::metadata(
            field,
            format!(
                "'{}' must consist of alphanumeric characters, '-', '_' or '.', \
                 and must start and end with an alphanumeric character",
                value
            ),
        ));
    }
    Ok(())
}

/// `[prefix/]name` where prefix is a DNS subdomain
fn validate_qualified_key(field: &str, key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > DNS_SUBDOMAIN_MAX || !DNS_SUBDOMAIN.is_match(prefix)
        {
            return Err(CoreError::metadata(
                field,
                format!("key '{}' has an invalid prefix: must be a DNS subdomain", key),
            ));
        }
    }

    if name.is_empty() || name.len() > QUALIFIED_NAME_MAX || !QUALIFIED_NAME.is_match(name) {
        return Err(CoreError::metadata(
            field,
            format!(
                "key '{}' must have a name part of at most {} alphanumeric characters, \
                 '-', '_' or '.', starting and ending with an alphanumeric character",
                key, QUALIFIED_NAME_MAX
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_valid_metadata() {
        let meta = ObjectMetadata::new("timeout-global", "kuma-system")
            .with_labels(labels(&[("kuma.io/mesh", "default"), ("tier", "")]))
            .with_annotations(labels(&[("example.com/owner", "Team Platform!")]));
        assert!(meta.validate().is_ok());
        assert_eq!(meta.id(), "kuma-system/timeout-global");
    }

    #[test]
    fn test_errors_collects_every_field() {
        let meta = ObjectMetadata::new("Bad_Name", "bad.namespace")
            .with_labels(labels(&[("-bad-key", "ok")]));
        let fields: Vec<_> = meta
            .errors()
            .into_iter()
            .map(|e| match e {
                CoreError::InvalidMetadata { field, .. } => field,
                other => panic!("unexpected {other}"),
            })
            .collect();
        assert_eq!(
            fields,
            ["metadata.name", "metadata.namespace", "metadata.labels"]
        );
        assert!(matches!(
            meta.validate(),
            Err(CoreError::InvalidMetadata { field, .. }) if field == "metadata.name"
        ));
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("a.b-c").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("Upper").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("trailing.").is_err());
        assert!(validate_name(&"a".repeat(253)).is_ok());
        assert!(validate_name(&"a".repeat(254)).is_err());
    }

    #[test]
    fn test_namespace_rules() {
        assert!(validate_namespace("kuma-system").is_ok());
        assert!(validate_namespace("kuma.system").is_err());
        assert!(validate_namespace(&"n".repeat(63)).is_ok());
        assert!(validate_namespace(&"n".repeat(64)).is_err());

        let err = validate_namespace("").unwrap_err();
        assert!(matches!(err, CoreError::InvalidMetadata { field, .. } if field == "metadata.namespace"));
    }

    #[test]
    fn test_label_key_rules() {
        assert!(validate_label_key("app").is_ok());
        assert!(validate_label_key("app.kubernetes.io/name").is_ok());
        assert!(validate_label_key("My_Key.v1").is_ok());
        assert!(validate_label_key("/name").is_err());
        assert!(validate_label_key("Bad_Prefix/name").is_err());
        assert!(validate_label_key("prefix/").is_err());
        assert!(validate_label_key("_leading").is_err());
        assert!(validate_label_key(&"k".repeat(64)).is_err());
    }

    #[test]
    fn test_label_value_rules() {
        assert!(validate_label_value("k", "").is_ok());
        assert!(validate_label_value("k", "v1.2_beta-3").is_ok());
        assert!(validate_label_value("k", "has space").is_err());
        assert!(validate_label_value("k", &"v".repeat(64)).is_err());
    }

    #[test]
    fn test_invalid_label_rejected_by_validate() {
        let meta = ObjectMetadata::new("ok", "ok").with_labels(labels(&[("bad key", "v")]));
        let err = meta.validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidMetadata { field, .. } if field == "metadata.labels"));
    }

    #[test]
    fn test_object_meta_conversion() {
        let meta = ObjectMeta {
            name: Some("retry".into()),
            namespace: Some("default".into()),
            labels: Some(BTreeMap::new()),
            annotations: Some(labels(&[("a", "b")])),
            resource_version: Some("42".into()),
            ..Default::default()
        };

        let converted = ObjectMetadata::from_object_meta(&meta).unwrap();
        assert_eq!(converted.name, "retry");
        assert_eq!(converted.labels, None);
        assert_eq!(converted.annotations, Some(labels(&[("a", "b")])));

        let back = converted.to_object_meta();
        assert_eq!(back.resource_version, None);
        assert_eq!(back.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn test_object_meta_requires_namespace() {
        let meta = ObjectMeta {
            name: Some("retry".into()),
            ..Default::default()
        };
        assert!(matches!(
            ObjectMetadata::from_object_meta(&meta),
            Err(CoreError::MissingField { .. })
        ));
    }
}
