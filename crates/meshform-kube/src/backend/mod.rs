//! Object backends
//!
//! The CRUD sequences only need three calls against dynamic objects. They go
//! through [`ObjectBackend`] so the same code runs against a cluster
//! ([`KubeBackend`]) or an in-memory store ([`MockBackend`]).

mod cluster;
mod mock;

pub use cluster::KubeBackend;
pub use mock::{MockBackend, Operation, OperationCounts};

use kube::core::{ApiResource, DynamicObject};
use async_trait::async_trait;

use crate::error::Result;

/// Server-side apply parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    pub field_manager: String,
    /// Take ownership of conflicting fields
    pub force: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            field_manager: crate::config::DEFAULT_FIELD_MANAGER.to_string(),
            force: false,
        }
    }
}

/// Access to namespaced dynamic objects
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetch an object; `None` when it does not exist
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    /// Create or update an object with server-side apply, returning the
    /// object as stored
    async fn apply(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
        options: &ApplyOptions,
    ) -> Result<DynamicObject>;

    /// Delete an object; `false` when it was already gone
    async fn delete(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<bool>;
}
