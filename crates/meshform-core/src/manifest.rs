//! Manifest rendering and parsing
//!
//! Rendering works entirely offline: the metadata is checked against the
//! Kubernetes naming rules, the spec is validated against the kind's schema
//! and normalized through its typed struct, and the object is serialized to
//! YAML. Parsing goes the other way for multi-document files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::kind::{API_VERSION, PolicyKind};
use crate::metadata::ObjectMetadata;
use crate::schema::SpecValidator;
use crate::state::ManifestState;

/// Namespace assumed for documents that do not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Input of the manifest data source
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ManifestInput {
    pub metadata: ObjectMetadata,
    #[serde(default = "empty_spec")]
    pub spec: Value,
}

fn empty_spec() -> Value {
    Value::Object(Default::default())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestBody<'a> {
    api_version: &'a str,
    kind: &'a str,
    metadata: &'a ObjectMetadata,
    spec: &'a Value,
}

/// Validate and render a single object as YAML
pub fn render_manifest(kind: PolicyKind, metadata: &ObjectMetadata, spec: Value) -> Result<String> {
    let validator = SpecValidator::new(kind)?;
    let spec = prepare_spec(&validator, metadata, spec)?;
    to_yaml(kind, metadata, &spec)
}

/// Check metadata and spec, returning the normalized spec.
///
/// Metadata and schema problems are reported together.
fn prepare_spec(validator: &SpecValidator, metadata: &ObjectMetadata, spec: Value) -> Result<Value> {
    let kind = validator.kind();
    let mut errors = metadata.errors();
    if let Err(e) = validator.validate(&spec).into_result(kind) {
        errors.push(e);
    }
    if let Some(err) = CoreError::combine(errors) {
        return Err(err);
    }
    kind.normalize_spec(spec)
}

fn to_yaml(kind: PolicyKind, metadata: &ObjectMetadata, spec: &Value) -> Result<String> {
    let body = ManifestBody {
        api_version: kind.api_version(),
        kind: kind.kind(),
        metadata,
        spec,
    };
    serde_yaml::to_string(&body).map_err(|e| CoreError::Marshal {
        kind: kind.kind().to_string(),
        message: e.to_string(),
    })
}

/// Renders manifests for one kind, reusing the compiled schema
pub struct ManifestDataSource {
    validator: SpecValidator,
}

impl ManifestDataSource {
    pub fn new(kind: PolicyKind) -> Result<Self> {
        Ok(Self {
            validator: SpecValidator::new(kind)?,
        })
    }

    pub fn kind(&self) -> PolicyKind {
        self.validator.kind()
    }

    pub fn read(&self, input: ManifestInput) -> Result<ManifestState<Value>> {
        let spec = prepare_spec(&self.validator, &input.metadata, input.spec)?;
        let yaml = to_yaml(self.kind(), &input.metadata, &spec)?;
        Ok(ManifestState {
            id: input.metadata.id(),
            metadata: input.metadata,
            spec,
            yaml,
        })
    }
}

/// One policy object parsed from a manifest file
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestDocument {
    pub api_version: String,
    pub kind: PolicyKind,
    pub metadata: ObjectMetadata,
    pub spec: Value,
}

impl ManifestDocument {
    /// Display name, e.g. `MeshTimeout kuma-system/timeout`
    pub fn display_name(&self) -> String {
        format!("{} {}", self.kind, self.metadata.id())
    }

    /// Run the same checks as rendering, returning the normalized spec
    pub fn check(&self) -> Result<Value> {
        let validator = SpecValidator::new(self.kind)?;
        prepare_spec(&validator, &self.metadata, self.spec.clone())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    api_version: String,
    kind: String,
    metadata: RawMetadata,
    #[serde(default)]
    spec: Option<Value>,
}

#[derive(Deserialize)]
struct RawMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    annotations: Option<BTreeMap<String, String>>,
}

/// Split a multi-document YAML stream into policy documents.
///
/// Empty and comment-only documents are skipped. Errors name the 1-based
/// position of the failing document.
pub fn split_documents(text: &str) -> Result<Vec<ManifestDocument>> {
    let mut documents = Vec::new();

    let pieces = yaml_documents(text);
    let non_empty = pieces.iter().map(|doc| doc.trim()).filter(|doc| {
        !doc
            .lines()
            .all(|l| l.trim().is_empty() || l.trim().starts_with('#'))
    });

    for (index, doc) in non_empty.enumerate() {
        let document = parse_document(doc).map_err(|e| CoreError::InvalidManifest {
            message: format!("Failed to parse document {}: {}", index + 1, inner_message(e)),
        })?;
        documents.push(document);
    }

    Ok(documents)
}

/// Message of a document error without the outer "Invalid manifest" prefix
fn inner_message(error: CoreError) -> String {
    match error {
        CoreError::InvalidManifest { message } => message,
        other => other.to_string(),
    }
}

/// Split on `---` separator lines, ignoring `---` inside values
fn yaml_documents(text: &str) -> Vec<String> {
    let mut docs = vec![String::new()];
    for line in text.lines() {
        if line.trim_end() == "---" || line.starts_with("--- ") {
            docs.push(String::new());
            continue;
        }
        if let Some(current) = docs.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    docs
}

fn parse_document(doc: &str) -> Result<ManifestDocument> {
    let raw: RawDocument = serde_yaml::from_str(doc)?;

    if raw.api_version != API_VERSION {
        return Err(CoreError::InvalidManifest {
            message: format!(
                "unsupported apiVersion '{}', expected '{}'",
                raw.api_version, API_VERSION
            ),
        });
    }

    let kind = PolicyKind::from_kind(&raw.kind).ok_or_else(|| CoreError::UnknownKind {
        name: raw.kind.clone(),
    })?;

    Ok(ManifestDocument {
        api_version: raw.api_version,
        kind,
        metadata: ObjectMetadata {
            name: raw.metadata.name,
            namespace: raw
                .metadata
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            labels: raw.metadata.labels,
            annotations: raw.metadata.annotations,
        },
        spec: raw.spec.unwrap_or_else(empty_spec),
    })
}
