//! Manifest command - render one policy as YAML, offline

use std::path::Path;

use meshform_core::{ManifestDataSource, ManifestInput, ObjectMetadata};
use serde_json::Value;

use crate::commands::{parse_key_values, parse_kind, read_file};
use crate::error::Result;

pub fn run(
    kind: &str,
    name: &str,
    namespace: &str,
    spec_file: Option<&Path>,
    labels: &[String],
    annotations: &[String],
) -> Result<()> {
    let kind = parse_kind(kind)?;

    let spec = match spec_file {
        Some(path) => load_spec(path)?,
        None => Value::Object(Default::default()),
    };

    let metadata = ObjectMetadata {
        name: name.to_string(),
        namespace: namespace.to_string(),
        labels: parse_key_values("label", labels)?,
        annotations: parse_key_values("annotation", annotations)?,
    };

    let state = ManifestDataSource::new(kind)?.read(ManifestInput { metadata, spec })?;
    print!("{}", state.yaml);
    Ok(())
}

/// Spec file: YAML (JSON is a subset); an empty file means an empty spec
fn load_spec(path: &Path) -> Result<Value> {
    let text = read_file(path)?;
    let spec: Option<Value> = serde_yaml::from_str(&text)?;
    Ok(spec.unwrap_or_else(|| Value::Object(Default::default())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_spec() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("spec.yaml");
        std::fs::write(&yaml, "targetRef:\n  kind: Mesh\n").unwrap();
        assert_eq!(load_spec(&yaml).unwrap()["targetRef"]["kind"], "Mesh");

        let json = dir.path().join("spec.json");
        std::fs::write(&json, r#"{"targetRef": {"kind": "MeshService", "name": "web"}}"#).unwrap();
        assert_eq!(load_spec(&json).unwrap()["targetRef"]["name"], "web");

        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "").unwrap();
        assert!(load_spec(&empty).unwrap().as_object().unwrap().is_empty());
    }
}
