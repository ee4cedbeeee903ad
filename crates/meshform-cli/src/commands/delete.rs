//! Delete command - remove a policy from the cluster

use console::style;
use meshform_core::{ObjectMetadata, PolicyState};
use meshform_kube::ResourceState;
use serde_json::Value;

use crate::commands::{ClusterArgs, parse_kind};
use crate::error::Result;

pub async fn run(cluster: &ClusterArgs, kind: &str, namespace: &str, name: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let provider = cluster.provider().await?;

    // Deletion only needs the identity; the spec is never read
    let state = ResourceState {
        policy: PolicyState::new(
            kind,
            ObjectMetadata::new(name, namespace),
            Value::Object(Default::default()),
        ),
        field_manager: provider.config().field_manager.clone(),
        force_conflicts: provider.config().force_conflicts,
    };

    provider.delete(kind.type_name(), state).await?;
    println!(
        "{} {} {}/{} deleted",
        style("✓").green().bold(),
        style(kind).cyan(),
        namespace,
        name
    );
    Ok(())
}
