//! Import command - adopt an existing policy as a managed resource

use meshform_kube::parse_import_id;

use crate::OutputFormat;
use crate::commands::{ClusterArgs, parse_kind, print_output};
use crate::error::Result;

pub async fn run(cluster: &ClusterArgs, kind: &str, id: &str, output: OutputFormat) -> Result<()> {
    let kind = parse_kind(kind)?;
    parse_import_id(id)?;
    let provider = cluster.provider().await?;
    let state = provider.import_state(kind.type_name(), id).await?;
    print_output(&state, output)
}
