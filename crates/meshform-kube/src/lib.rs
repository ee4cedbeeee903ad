//! meshform kube: Kubernetes integration for meshform
//!
//! This crate provides:
//! - **Configuration**: provider settings and Kubernetes client construction
//! - **Backends**: dynamic-object access against a cluster or in memory
//! - **Data sources**: typed reads of existing policies
//! - **Resources**: create, read, update, delete and import via server-side apply
//! - **Provider**: type-name based dispatch over all of the above

pub mod backend;
pub mod config;
pub mod data_source;
pub mod error;
pub mod objects;
pub mod provider;
pub mod resource;

pub use backend::{ApplyOptions, KubeBackend, MockBackend, ObjectBackend, Operation, OperationCounts};
pub use config::{DEFAULT_FIELD_MANAGER, ProviderConfig};
pub use data_source::DataSource;
pub use error::{KubeError, Result};
pub use provider::Provider;
pub use resource::{Resource, ResourcePlan, ResourceState, parse_import_id};
