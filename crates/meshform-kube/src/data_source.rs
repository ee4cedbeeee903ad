//! Data sources: read an existing policy from the cluster

use meshform_core::{Policy, PolicyState};
use tracing::debug;

use crate::backend::ObjectBackend;
use crate::error::{KubeError, Result};
use crate::objects::{metadata_from_dynamic, spec_from_dynamic};

/// Read-only view of policies of any kind
pub struct DataSource<'a, B: ObjectBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: ObjectBackend + ?Sized> DataSource<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Fetch `namespace/name` and expose its typed state.
    ///
    /// A missing object is an error here, unlike a resource read.
    pub async fn read<K: Policy>(&self, namespace: &str, name: &str) -> Result<PolicyState<K::Spec>> {
        let kind = K::KIND.kind();
        let resource = K::KIND.api_resource();
        debug!(%kind, %namespace, %name, "reading data source");

        let object = self
            .backend
            .get(&resource, namespace, name)
            .await
            .map_err(|e| KubeError::get(kind, e))?
            .ok_or_else(|| KubeError::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let spec = spec_from_dynamic::<K>(&object)?;
        let metadata = metadata_from_dynamic::<K>(&object)?;
        Ok(PolicyState::new(K::KIND, metadata, spec))
    }
}
