//! Provider: type-name based access to every data source and resource
//!
//! Callers that only know a type name (`kuma_io_mesh_timeout_v1alpha1`) and
//! hold specs as JSON go through here; the typed API lives in
//! [`DataSource`] and [`Resource`].

use meshform_core::{
    CoreError, ManifestDataSource, ManifestInput, ManifestState, Policy, PolicyKind, PolicyState,
    SpecValidator, with_policy_type,
};
use serde_json::Value;

use crate::backend::ObjectBackend;
use crate::config::ProviderConfig;
use crate::data_source::DataSource;
use crate::error::{KubeError, Result};
use crate::resource::{Resource, ResourcePlan, ResourceState};

pub struct Provider<B: ObjectBackend> {
    backend: B,
    config: ProviderConfig,
}

impl<B: ObjectBackend> Provider<B> {
    pub fn new(backend: B, config: ProviderConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Data source type names, manifest data sources included
    pub fn data_source_type_names(&self) -> Vec<&'static str> {
        PolicyKind::ALL
            .iter()
            .flat_map(|k| [k.type_name(), k.manifest_type_name()])
            .collect()
    }

    pub fn resource_type_names(&self) -> Vec<&'static str> {
        PolicyKind::ALL.iter().map(|k| k.type_name()).collect()
    }

    fn resource(&self) -> Resource<'_, B> {
        Resource::new(&self.backend, self.config.apply_options())
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        namespace: &str,
        name: &str,
    ) -> Result<PolicyState<Value>> {
        let kind = kind_for_type(type_name)?;
        let source = DataSource::new(&self.backend);
        with_policy_type!(kind, K => {
            source
                .read::<K>(namespace, name)
                .await?
                .try_map_spec(|s| serde_json::to_value(s).map_err(KubeError::from))
        })
    }

    /// Render a manifest; never touches the cluster
    pub fn read_manifest(&self, type_name: &str, input: ManifestInput) -> Result<ManifestState<Value>> {
        let kind = kind_for_manifest_type(type_name)?;
        Ok(ManifestDataSource::new(kind)?.read(input)?)
    }

    pub async fn create(
        &self,
        type_name: &str,
        plan: ResourcePlan<Value>,
    ) -> Result<ResourceState<Value>> {
        let kind = kind_for_type(type_name)?;
        let resource = self.resource();
        with_policy_type!(kind, K => {
            let plan = typed_plan::<K>(plan)?;
            untyped_state(resource.create::<K>(plan).await?)
        })
    }

    pub async fn read(
        &self,
        type_name: &str,
        state: ResourceState<Value>,
    ) -> Result<Option<ResourceState<Value>>> {
        let kind = kind_for_type(type_name)?;
        let resource = self.resource();
        with_policy_type!(kind, K => {
            let state = typed_state::<K>(state)?;
            resource.read::<K>(state).await?.map(untyped_state).transpose()
        })
    }

    pub async fn update(
        &self,
        type_name: &str,
        plan: ResourcePlan<Value>,
    ) -> Result<ResourceState<Value>> {
        let kind = kind_for_type(type_name)?;
        let resource = self.resource();
        with_policy_type!(kind, K => {
            let plan = typed_plan::<K>(plan)?;
            untyped_state(resource.update::<K>(plan).await?)
        })
    }

    pub async fn delete(&self, type_name: &str, state: ResourceState<Value>) -> Result<()> {
        let kind = kind_for_type(type_name)?;
        let resource = self.resource();
        with_policy_type!(kind, K => {
            let state = typed_state::<K>(state)?;
            resource.delete::<K>(&state).await
        })
    }

    pub async fn import_state(&self, type_name: &str, id: &str) -> Result<ResourceState<Value>> {
        let kind = kind_for_type(type_name)?;
        let resource = self.resource();
        with_policy_type!(kind, K => {
            untyped_state(resource.import_state::<K>(id).await?)
        })
    }
}

fn kind_for_type(type_name: &str) -> Result<PolicyKind> {
    PolicyKind::ALL
        .iter()
        .copied()
        .find(|k| k.type_name() == type_name)
        .ok_or_else(|| KubeError::UnknownType(type_name.to_string()))
}

fn kind_for_manifest_type(type_name: &str) -> Result<PolicyKind> {
    PolicyKind::ALL
        .iter()
        .copied()
        .find(|k| k.manifest_type_name() == type_name)
        .ok_or_else(|| KubeError::UnknownType(type_name.to_string()))
}

/// Validate a JSON spec against the schema, then decode it
fn typed_spec<K: Policy>(spec: Value) -> Result<K::Spec> {
    SpecValidator::new(K::KIND)?
        .validate(&spec)
        .into_result(K::KIND)?;
    serde_json::from_value(spec).map_err(|e| {
        KubeError::Core(CoreError::InvalidSpec {
            kind: K::KIND.kind().to_string(),
            message: e.to_string(),
        })
    })
}

fn typed_plan<K: Policy>(plan: ResourcePlan<Value>) -> Result<ResourcePlan<K::Spec>> {
    Ok(ResourcePlan {
        spec: typed_spec::<K>(plan.spec)?,
        metadata: plan.metadata,
        field_manager: plan.field_manager,
        force_conflicts: plan.force_conflicts,
    })
}

/// Recorded state is trusted: decode without schema validation
fn typed_state<K: Policy>(state: ResourceState<Value>) -> Result<ResourceState<K::Spec>> {
    state.try_map_spec(|spec| {
        serde_json::from_value(spec).map_err(|e| KubeError::unmarshal(K::KIND.kind(), e))
    })
}

fn untyped_state<S: serde::Serialize>(state: ResourceState<S>) -> Result<ResourceState<Value>> {
    state.try_map_spec(|spec| serde_json::to_value(spec).map_err(KubeError::from))
}
