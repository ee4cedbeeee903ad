//! Mock backend for testing
//!
//! Stores objects in memory and mimics the parts of server-side apply the
//! CRUD code relies on, so data sources and resources can be tested without
//! a Kubernetes cluster.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use kube::core::{ApiResource, DynamicObject, ErrorResponse, TypeMeta};

use super::{ApplyOptions, ObjectBackend};
use crate::error::{KubeError, Result};

/// Key of a stored object: plural, namespace, name
type ObjectKey = (String, String, String);

#[derive(Debug, Clone)]
struct StoredObject {
    object: DynamicObject,
    field_manager: String,
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Apply,
    Delete,
}

/// In-memory object backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    store: Arc<RwLock<HashMap<ObjectKey, StoredObject>>>,
    operations: Arc<RwLock<OperationCounts>>,
    failures: Arc<RwLock<HashMap<Operation, String>>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub applies: usize,
    pub deletes: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object as if another client had created it
    pub fn insert(&self, resource: &ApiResource, object: DynamicObject, field_manager: &str) {
        let key = key_of(resource, &object);
        let object = with_types(resource, object);
        self.store_mut().insert(
            key,
            StoredObject {
                object,
                field_manager: field_manager.to_string(),
            },
        );
    }

    /// Make every subsequent call of `operation` fail with `message`
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, message.into());
    }

    pub fn clear_failures(&self) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stored copy of an object
    pub fn object(&self, resource: &ApiResource, namespace: &str, name: &str) -> Option<DynamicObject> {
        self.store()
            .get(&(resource.plural.clone(), namespace.to_string(), name.to_string()))
            .map(|stored| stored.object.clone())
    }

    pub fn object_count(&self) -> usize {
        self.store().len()
    }

    fn store(&self) -> RwLockReadGuard<'_, HashMap<ObjectKey, StoredObject>> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_mut(&self) -> RwLockWriteGuard<'_, HashMap<ObjectKey, StoredObject>> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: Operation) -> Result<()> {
        {
            let mut ops = self
                .operations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match operation {
                Operation::Get => ops.gets += 1,
                Operation::Apply => ops.applies += 1,
                Operation::Delete => ops.deletes += 1,
            }
        }

        let failures = self.failures.read().unwrap_or_else(PoisonError::into_inner);
        match failures.get(&operation) {
            Some(message) => Err(KubeError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

fn key_of(resource: &ApiResource, object: &DynamicObject) -> ObjectKey {
    (
        resource.plural.clone(),
        object.metadata.namespace.clone().unwrap_or_default(),
        object.metadata.name.clone().unwrap_or_default(),
    )
}

fn with_types(resource: &ApiResource, mut object: DynamicObject) -> DynamicObject {
    object.types = Some(TypeMeta {
        api_version: resource.api_version.clone(),
        kind: resource.kind.clone(),
    });
    object
}

fn conflict(name: &str, owner: &str) -> KubeError {
    KubeError::Api(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!(
            "Apply failed with 1 conflict: conflict with \"{}\" on {}",
            owner, name
        ),
        reason: "Conflict".to_string(),
        code: 409,
    }))
}

#[async_trait]
impl ObjectBackend for MockBackend {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        self.record(Operation::Get)?;
        Ok(self.object(resource, namespace, name))
    }

    async fn apply(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
        options: &ApplyOptions,
    ) -> Result<DynamicObject> {
        self.record(Operation::Apply)?;

        let key = key_of(resource, object);
        if key.1.is_empty() || key.2.is_empty() {
            return Err(KubeError::InvalidConfig(
                "object has no name or namespace".to_string(),
            ));
        }

        let mut store = self.store_mut();
        let mut applied = with_types(resource, object.clone());

        match store.get(&key) {
            Some(existing) => {
                if existing.field_manager != options.field_manager && !options.force {
                    return Err(conflict(&key.2, &existing.field_manager));
                }
                let previous = &existing.object.metadata;
                let version = previous
                    .resource_version
                    .as_deref()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0);
                applied.metadata.uid = previous.uid.clone();
                applied.metadata.resource_version = Some((version + 1).to_string());
                applied.metadata.generation = Some(previous.generation.unwrap_or(1) + 1);
            }
            None => {
                applied.metadata.uid = Some(format!("mock-{}-{}-{}", key.0, key.1, key.2));
                applied.metadata.resource_version = Some("1".to_string());
                applied.metadata.generation = Some(1);
            }
        }

        store.insert(
            key,
            StoredObject {
                object: applied.clone(),
                field_manager: options.field_manager.clone(),
            },
        );
        Ok(applied)
    }

    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool> {
        self.record(Operation::Delete)?;
        let key = (resource.plural.clone(), namespace.to_string(), name.to_string());
        Ok(self.store_mut().remove(&key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshform_core::PolicyKind;

    fn object(name: &str) -> DynamicObject {
        let resource = PolicyKind::MeshTimeout.api_resource();
        let mut obj = DynamicObject::new(name, &resource).within("kuma-system");
        obj.data = serde_json::json!({"spec": {"targetRef": {"kind": "Mesh"}}});
        obj
    }

    #[tokio::test]
    async fn test_apply_get_delete() {
        let backend = MockBackend::new();
        let resource = PolicyKind::MeshTimeout.api_resource();
        let options = ApplyOptions::default();

        let created = backend.apply(&resource, &object("t"), &options).await.unwrap();
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert_eq!(created.types.as_ref().unwrap().kind, "MeshTimeout");

        let updated = backend.apply(&resource, &object("t"), &options).await.unwrap();
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
        assert_eq!(updated.metadata.uid, created.metadata.uid);

        let fetched = backend.get(&resource, "kuma-system", "t").await.unwrap();
        assert_eq!(fetched.unwrap().data["spec"]["targetRef"]["kind"], "Mesh");

        assert!(backend.delete(&resource, "kuma-system", "t").await.unwrap());
        assert!(!backend.delete(&resource, "kuma-system", "t").await.unwrap());
        assert!(backend.get(&resource, "kuma-system", "t").await.unwrap().is_none());

        assert_eq!(
            backend.operation_counts(),
            OperationCounts {
                gets: 2,
                applies: 2,
                deletes: 2
            }
        );
    }

    #[tokio::test]
    async fn test_conflicting_field_manager() {
        let backend = MockBackend::new();
        let resource = PolicyKind::MeshTimeout.api_resource();
        backend.insert(&resource, object("t"), "kubectl");

        let options = ApplyOptions::default();
        let err = backend.apply(&resource, &object("t"), &options).await.unwrap_err();
        assert!(err.is_conflict());

        let forced = ApplyOptions {
            force: true,
            ..ApplyOptions::default()
        };
        assert!(backend.apply(&resource, &object("t"), &forced).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MockBackend::new();
        let resource = PolicyKind::MeshTimeout.api_resource();
        backend.fail(Operation::Get, "connection refused");

        let err = backend.get(&resource, "ns", "x").await.unwrap_err();
        assert!(matches!(err, KubeError::Backend(msg) if msg == "connection refused"));

        backend.clear_failures();
        assert!(backend.get(&resource, "ns", "x").await.unwrap().is_none());
    }
}
