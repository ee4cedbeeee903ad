//! Resources: manage the lifecycle of a policy in the cluster
//!
//! Every write is a server-side apply, so create and update share one code
//! path. Reads refresh the spec from the cluster and keep the planned
//! metadata; a missing object on read means it was deleted out of band.

use meshform_core::{ObjectMetadata, Policy, PolicyState, SpecValidator, check_rules};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{ApplyOptions, ObjectBackend};
use crate::error::{KubeError, Result};
use crate::objects::{metadata_from_dynamic, spec_from_dynamic, to_dynamic};

/// Desired state of a resource
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePlan<S> {
    pub metadata: ObjectMetadata,
    pub spec: S,
    /// Defaults to the provider's field manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_conflicts: Option<bool>,
}

impl<S> ResourcePlan<S> {
    pub fn new(metadata: ObjectMetadata, spec: S) -> Self {
        Self {
            metadata,
            spec,
            field_manager: None,
            force_conflicts: None,
        }
    }
}

/// Recorded state of a resource
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState<S> {
    #[serde(flatten)]
    pub policy: PolicyState<S>,
    pub field_manager: String,
    pub force_conflicts: bool,
}

impl<S> ResourceState<S> {
    pub fn id(&self) -> &str {
        &self.policy.id
    }

    pub fn metadata(&self) -> &ObjectMetadata {
        &self.policy.metadata
    }

    pub fn try_map_spec<T, E>(
        self,
        f: impl FnOnce(S) -> std::result::Result<T, E>,
    ) -> std::result::Result<ResourceState<T>, E> {
        Ok(ResourceState {
            policy: self.policy.try_map_spec(f)?,
            field_manager: self.field_manager,
            force_conflicts: self.force_conflicts,
        })
    }
}

/// Split an import identifier into namespace and name
pub fn parse_import_id(id: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = id.split('/').collect();
    match parts.as_slice() {
        [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
            Ok((namespace.to_string(), name.to_string()))
        }
        _ => Err(KubeError::ImportId { id: id.to_string() }),
    }
}

/// Create, read, update, delete and import for policies of any kind
pub struct Resource<'a, B: ObjectBackend + ?Sized> {
    backend: &'a B,
    defaults: ApplyOptions,
}

impl<'a, B: ObjectBackend + ?Sized> Resource<'a, B> {
    /// `defaults` supplies the field manager and force flag for plans that
    /// leave them unset
    pub fn new(backend: &'a B, defaults: ApplyOptions) -> Self {
        Self { backend, defaults }
    }

    pub async fn create<K: Policy>(&self, plan: ResourcePlan<K::Spec>) -> Result<ResourceState<K::Spec>> {
        let kind = K::KIND.kind();
        plan.metadata.validate()?;
        SpecValidator::new(K::KIND)?
            .validate(&serde_json::to_value(&plan.spec)?)
            .into_result(K::KIND)?;
        check_rules(K::KIND, &plan.spec)?;

        let options = ApplyOptions {
            field_manager: plan
                .field_manager
                .clone()
                .unwrap_or_else(|| self.defaults.field_manager.clone()),
            force: plan.force_conflicts.unwrap_or(self.defaults.force),
        };

        let object = to_dynamic::<K>(&plan.metadata, &plan.spec)?;
        let resource = K::KIND.api_resource();
        debug!(%kind, id = %plan.metadata.id(), field_manager = %options.field_manager, "applying resource");

        let applied = self
            .backend
            .apply(&resource, &object, &options)
            .await
            .map_err(|e| KubeError::apply(kind, e))?;
        let spec = spec_from_dynamic::<K>(&applied)?;

        Ok(ResourceState {
            policy: PolicyState::new(K::KIND, plan.metadata, spec),
            field_manager: options.field_manager,
            force_conflicts: options.force,
        })
    }

    /// Refresh `state` from the cluster; `None` when the object is gone
    pub async fn read<K: Policy>(
        &self,
        state: ResourceState<K::Spec>,
    ) -> Result<Option<ResourceState<K::Spec>>> {
        let kind = K::KIND.kind();
        let resource = K::KIND.api_resource();
        let (namespace, name) = (&state.metadata().namespace, &state.metadata().name);
        debug!(%kind, %namespace, %name, "reading resource");

        let Some(object) = self
            .backend
            .get(&resource, namespace, name)
            .await
            .map_err(|e| KubeError::get(kind, e))?
        else {
            warn!(%kind, id = %state.id(), "resource no longer exists, removing from state");
            return Ok(None);
        };

        let spec = spec_from_dynamic::<K>(&object)?;
        Ok(Some(ResourceState {
            policy: PolicyState {
                spec,
                ..state.policy
            },
            field_manager: state.field_manager,
            force_conflicts: state.force_conflicts,
        }))
    }

    /// Same as create: apply converges the object on the plan
    pub async fn update<K: Policy>(&self, plan: ResourcePlan<K::Spec>) -> Result<ResourceState<K::Spec>> {
        self.create::<K>(plan).await
    }

    /// Delete the object; an already deleted object is not an error
    pub async fn delete<K: Policy>(&self, state: &ResourceState<K::Spec>) -> Result<()> {
        let kind = K::KIND.kind();
        let resource = K::KIND.api_resource();
        let metadata = state.metadata();

        let deleted = self
            .backend
            .delete(&resource, &metadata.namespace, &metadata.name)
            .await
            .map_err(|e| KubeError::delete(kind, e))?;
        if !deleted {
            debug!(%kind, id = %state.id(), "resource already deleted");
        }
        Ok(())
    }

    /// Adopt an existing object identified by `namespace/name`
    pub async fn import_state<K: Policy>(&self, id: &str) -> Result<ResourceState<K::Spec>> {
        let (namespace, name) = parse_import_id(id)?;
        let kind = K::KIND.kind();
        let resource = K::KIND.api_resource();
        debug!(%kind, %namespace, %name, "importing resource");

        let object = self
            .backend
            .get(&resource, &namespace, &name)
            .await
            .map_err(|e| KubeError::get(kind, e))?
            .ok_or_else(|| KubeError::NotFound {
                kind: kind.to_string(),
                namespace: namespace.clone(),
                name: name.clone(),
            })?;

        let spec = spec_from_dynamic::<K>(&object)?;
        let metadata = metadata_from_dynamic::<K>(&object)?;
        Ok(ResourceState {
            policy: PolicyState::new(K::KIND, metadata, spec),
            field_manager: self.defaults.field_manager.clone(),
            force_conflicts: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, Operation};
    use meshform_core::PolicyKind;
    use meshform_core::policies::{
        MeshFaultInjection, MeshFaultInjectionSpec, MeshRetry, MeshRetrySpec, MeshTimeout,
        MeshTimeoutSpec,
    };
    use meshform_core::{CoreError, TargetRef};

    fn plan(idle: &str) -> ResourcePlan<MeshTimeoutSpec> {
        let spec: MeshTimeoutSpec = serde_json::from_value(serde_json::json!({
            "targetRef": {"kind": "Mesh"},
            "to": [{"targetRef": {"kind": "Mesh"}, "default": {"idleTimeout": idle}}]
        }))
        .unwrap();
        ResourcePlan::new(ObjectMetadata::new("timeout", "kuma-system"), spec)
    }

    fn idle_timeout(spec: &MeshTimeoutSpec) -> Option<String> {
        spec.to.as_ref()?[0].default.as_ref()?.idle_timeout.clone()
    }

    #[tokio::test]
    async fn test_crud_lifecycle() {
        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());

        let created = resource.create::<MeshTimeout>(plan("10s")).await.unwrap();
        assert_eq!(created.id(), "kuma-system/timeout");
        assert_eq!(created.field_manager, "meshform");
        assert!(!created.force_conflicts);
        assert_eq!(idle_timeout(&created.policy.spec).as_deref(), Some("10s"));

        let read = resource.read::<MeshTimeout>(created.clone()).await.unwrap().unwrap();
        assert_eq!(read, created);

        let updated = resource.update::<MeshTimeout>(plan("30s")).await.unwrap();
        assert_eq!(idle_timeout(&updated.policy.spec).as_deref(), Some("30s"));
        let stored = backend
            .object(&PolicyKind::MeshTimeout.api_resource(), "kuma-system", "timeout")
            .unwrap();
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("2"));

        resource.delete::<MeshTimeout>(&updated).await.unwrap();
        assert!(resource.read::<MeshTimeout>(updated).await.unwrap().is_none());
        assert_eq!(backend.object_count(), 0);
    }

    #[tokio::test]
    async fn test_read_refreshes_spec_keeps_metadata() {
        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());
        let created = resource.create::<MeshTimeout>(plan("10s")).await.unwrap();

        // Drift introduced by another client, including a server-added label
        let ar = PolicyKind::MeshTimeout.api_resource();
        let mut drifted = backend.object(&ar, "kuma-system", "timeout").unwrap();
        drifted.data["spec"]["to"][0]["default"]["idleTimeout"] = "5m".into();
        drifted.metadata.labels = Some([("kuma.io/origin".to_string(), "zone".to_string())].into());
        backend.insert(&ar, drifted, "meshform");

        let read = resource.read::<MeshTimeout>(created).await.unwrap().unwrap();
        assert_eq!(idle_timeout(&read.policy.spec).as_deref(), Some("5m"));
        assert_eq!(read.metadata().labels, None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());
        let created = resource.create::<MeshTimeout>(plan("10s")).await.unwrap();

        resource.delete::<MeshTimeout>(&created).await.unwrap();
        resource.delete::<MeshTimeout>(&created).await.unwrap();
        assert_eq!(backend.operation_counts().deletes, 2);
    }

    #[tokio::test]
    async fn test_create_validates_before_apply() {
        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());

        let mut bad_name = plan("10s");
        bad_name.metadata.name = "Not_Valid".to_string();
        let err = resource.create::<MeshTimeout>(bad_name).await.unwrap_err();
        assert!(matches!(err, KubeError::Core(CoreError::InvalidMetadata { .. })));

        let err = resource.create::<MeshTimeout>(plan("forever")).await.unwrap_err();
        assert!(matches!(err, KubeError::Core(CoreError::SpecValidation { .. })));

        assert_eq!(backend.operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_create_checks_semantic_rules() {
        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());

        let spec: MeshFaultInjectionSpec = serde_json::from_value(serde_json::json!({
            "from": [{
                "targetRef": {"kind": "Mesh"},
                "default": {"http": [{"abort": {"httpStatus": 500, "percentage": 250}}]}
            }]
        }))
        .unwrap();
        let plan = ResourcePlan::new(ObjectMetadata::new("faults", "kuma-system"), spec);
        let err = resource.create::<MeshFaultInjection>(plan).await.unwrap_err();
        match err {
            KubeError::Core(CoreError::SpecValidation { issues, .. }) => {
                assert_eq!(issues[0].path, "/from/0/default/http/0/abort/percentage");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.operation_counts().applies, 0);
    }

    #[tokio::test]
    async fn test_plan_overrides_apply_options() {
        let backend = MockBackend::new();
        let ar = PolicyKind::MeshTimeout.api_resource();
        let resource = Resource::new(&backend, ApplyOptions::default());
        resource.create::<MeshTimeout>(plan("10s")).await.unwrap();

        let mut other = plan("20s");
        other.field_manager = Some("gitops".to_string());
        let err = resource.create::<MeshTimeout>(other.clone()).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            err.diagnostics().iter().next().unwrap().summary,
            "Unable to APPLY resource"
        );

        other.force_conflicts = Some(true);
        let state = resource.create::<MeshTimeout>(other).await.unwrap();
        assert_eq!(state.field_manager, "gitops");
        assert!(state.force_conflicts);
        assert!(backend.object(&ar, "kuma-system", "timeout").is_some());
    }

    #[tokio::test]
    async fn test_import_state() {
        let backend = MockBackend::new();
        let defaults = ApplyOptions {
            field_manager: "terraform".to_string(),
            force: true,
        };
        let writer = Resource::new(&backend, ApplyOptions::default());
        let spec = MeshRetrySpec {
            target_ref: Some(TargetRef::mesh()),
            ..Default::default()
        };
        writer
            .create::<MeshRetry>(ResourcePlan::new(ObjectMetadata::new("retry", "kuma-system"), spec))
            .await
            .unwrap();

        let resource = Resource::new(&backend, defaults);
        let imported = resource.import_state::<MeshRetry>("kuma-system/retry").await.unwrap();
        assert_eq!(imported.id(), "kuma-system/retry");
        assert_eq!(imported.field_manager, "terraform");
        assert!(!imported.force_conflicts);

        let missing = resource.import_state::<MeshRetry>("kuma-system/other").await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_import_id_format() {
        assert_eq!(
            parse_import_id("kuma-system/retry").unwrap(),
            ("kuma-system".to_string(), "retry".to_string())
        );
        for id in ["retry", "/retry", "ns/", "a/b/c", ""] {
            let err = parse_import_id(id).unwrap_err();
            assert!(matches!(err, KubeError::ImportId { .. }), "{}", id);
        }

        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());
        let err = resource.import_state::<MeshRetry>("bogus").await.unwrap_err();
        assert_eq!(
            err.diagnostics().iter().next().unwrap().summary,
            "Unexpected Import Identifier"
        );
        assert_eq!(backend.operation_counts().gets, 0);
    }

    #[tokio::test]
    async fn test_delete_failure() {
        let backend = MockBackend::new();
        let resource = Resource::new(&backend, ApplyOptions::default());
        let created = resource.create::<MeshTimeout>(plan("10s")).await.unwrap();

        backend.fail(Operation::Delete, "forbidden");
        let err = resource.delete::<MeshTimeout>(&created).await.unwrap_err();
        let diags = err.diagnostics();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Unable to DELETE resource");
        assert!(diag.detail.contains("DELETE Error (MeshTimeout): backend error: forbidden"));
    }
}
