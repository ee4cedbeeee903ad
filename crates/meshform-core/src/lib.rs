//! meshform core: typed Kuma policy CRDs and everything that works offline
//!
//! - `policies`: one `kube::CustomResource` per Kuma `kuma.io/v1alpha1` policy kind
//! - `kind`: runtime registry over the policy kinds
//! - `metadata`: object metadata and Kubernetes naming rules
//! - `schema`: spec validation against the generated JSON schema
//! - `manifest`: YAML rendering and multi-document parsing
//! - `state`: data source and resource state models
//! - `diagnostics`: user-facing error reporting

pub mod common;
pub mod diagnostics;
pub mod error;
pub mod kind;
pub mod manifest;
pub mod metadata;
pub mod policies;
pub mod schema;
pub mod state;
pub mod target_ref;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CoreError, Result};
pub use kind::{API_VERSION, GROUP, Policy, PolicyKind, VERSION};
pub use manifest::{
    ManifestDataSource, ManifestDocument, ManifestInput, render_manifest, split_documents,
};
pub use metadata::ObjectMetadata;
pub use schema::{SpecRules, SpecValidator, ValidationIssue, ValidationResult, check_rules};
pub use state::{ManifestState, PolicyState};
pub use target_ref::{BackendRef, TargetRef, TargetRefKind};
