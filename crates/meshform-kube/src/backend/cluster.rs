//! Backend talking to a Kubernetes API server

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PropagationPolicy};
use kube::core::{ApiResource, DynamicObject};
use kube::Client;
use tracing::debug;

use super::{ApplyOptions, ObjectBackend};
use crate::error::{KubeError, Result};

/// Dynamic-object backend on top of `kube::Api<DynamicObject>`
#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
}

impl KubeBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}

#[async_trait]
impl ObjectBackend for KubeBackend {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        debug!(kind = %resource.kind, %namespace, %name, "GET");
        Ok(self.api(resource, namespace).get_opt(name).await?)
    }

    async fn apply(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
        options: &ApplyOptions,
    ) -> Result<DynamicObject> {
        let name = object
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| KubeError::InvalidConfig("object has no name".to_string()))?;
        let namespace = object
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| KubeError::InvalidConfig("object has no namespace".to_string()))?;

        let mut params = PatchParams::apply(&options.field_manager);
        params.force = options.force;

        debug!(
            kind = %resource.kind,
            %namespace,
            %name,
            field_manager = %options.field_manager,
            force = options.force,
            "APPLY"
        );
        let applied = self
            .api(resource, namespace)
            .patch(name, &params, &Patch::Apply(object))
            .await?;
        Ok(applied)
    }

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool> {
        let params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };

        debug!(kind = %resource.kind, %namespace, %name, "DELETE");
        match self.api(resource, namespace).delete(name, &params).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = KubeError::from(e);
                if err.is_not_found() {
                    debug!(kind = %resource.kind, %namespace, %name, "already deleted");
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}
