//! Conversions between typed policies and dynamic objects

use kube::core::DynamicObject;
use meshform_core::{ObjectMetadata, Policy};
use serde_json::Value;

use crate::error::{KubeError, Result};

/// Build the object sent on apply: metadata plus `spec`, nothing else
pub fn to_dynamic<K: Policy>(metadata: &ObjectMetadata, spec: &K::Spec) -> Result<DynamicObject> {
    let resource = K::KIND.api_resource();
    let mut object = DynamicObject::new(&metadata.name, &resource).within(&metadata.namespace);
    object.metadata.labels = metadata.labels.clone();
    object.metadata.annotations = metadata.annotations.clone();
    object.data = serde_json::json!({ "spec": serde_json::to_value(spec)? });
    Ok(object)
}

/// Decode the `spec` of a server object into the typed struct.
///
/// A missing spec decodes as an empty one; fields the struct does not know
/// are dropped.
pub fn spec_from_dynamic<K: Policy>(object: &DynamicObject) -> Result<K::Spec> {
    let spec = object
        .data
        .get("spec")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(spec).map_err(|e| KubeError::unmarshal(K::KIND.kind(), e))
}

/// Metadata of a server object, limited to the fields the provider manages
pub fn metadata_from_dynamic<K: Policy>(object: &DynamicObject) -> Result<ObjectMetadata> {
    ObjectMetadata::from_object_meta(&object.metadata)
        .map_err(|e| KubeError::unmarshal(K::KIND.kind(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshform_core::policies::{MeshTimeout, MeshTrafficPermission};
    use std::collections::BTreeMap;

    #[test]
    fn test_to_dynamic() {
        let mut labels = BTreeMap::new();
        labels.insert("kuma.io/mesh".to_string(), "default".to_string());
        let metadata = ObjectMetadata::new("t", "kuma-system").with_labels(labels.clone());
        let spec = serde_json::from_value(serde_json::json!({"targetRef": {"kind": "Mesh"}})).unwrap();

        let object = to_dynamic::<MeshTimeout>(&metadata, &spec).unwrap();
        let types = object.types.as_ref().unwrap();
        assert_eq!(types.api_version, "kuma.io/v1alpha1");
        assert_eq!(types.kind, "MeshTimeout");
        assert_eq!(object.metadata.namespace.as_deref(), Some("kuma-system"));
        assert_eq!(object.metadata.labels, Some(labels));
        assert_eq!(object.data, serde_json::json!({"spec": {"targetRef": {"kind": "Mesh"}}}));
    }

    #[test]
    fn test_spec_from_dynamic_drops_unknown_fields() {
        let resource = meshform_core::PolicyKind::MeshTrafficPermission.api_resource();
        let mut object = DynamicObject::new("allow", &resource).within("ns");
        object.data = serde_json::json!({
            "spec": {
                "targetRef": {"kind": "Mesh"},
                "from": [{"targetRef": {"kind": "Mesh"}, "default": {"action": "Allow"}}],
                "serverSide": true
            },
            "status": {"ok": true}
        });

        let spec = spec_from_dynamic::<MeshTrafficPermission>(&object).unwrap();
        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("serverSide").is_none());
        assert_eq!(value["from"][0]["default"]["action"], "Allow");
    }

    #[test]
    fn test_spec_from_dynamic_reports_unmarshal_error() {
        let resource = meshform_core::PolicyKind::MeshTimeout.api_resource();
        let mut object = DynamicObject::new("t", &resource).within("ns");
        object.data = serde_json::json!({"spec": {"rules": "not a list"}});

        let err = spec_from_dynamic::<MeshTimeout>(&object).unwrap_err();
        assert!(matches!(err, KubeError::Unmarshal { ref kind, .. } if kind == "MeshTimeout"));
        assert_eq!(
            err.diagnostics().iter().next().unwrap().summary,
            "Unable to unmarshal resource"
        );
    }

    #[test]
    fn test_missing_spec_is_empty() {
        let resource = meshform_core::PolicyKind::MeshTimeout.api_resource();
        let object = DynamicObject::new("t", &resource).within("ns");
        let spec = spec_from_dynamic::<MeshTimeout>(&object).unwrap();
        assert_eq!(spec, Default::default());
    }
}
