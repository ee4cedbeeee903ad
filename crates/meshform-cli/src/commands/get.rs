//! Get command - read a policy through its data source

use console::style;

use crate::OutputFormat;
use crate::commands::{ClusterArgs, parse_kind, print_output};
use crate::error::Result;

pub async fn run(
    cluster: &ClusterArgs,
    kind: &str,
    namespace: &str,
    name: &str,
    output: OutputFormat,
) -> Result<()> {
    let kind = parse_kind(kind)?;
    let provider = cluster.provider().await?;

    eprintln!(
        "{} Reading {} {}/{}",
        style("→").blue().bold(),
        style(kind).cyan(),
        namespace,
        name
    );

    let state = provider
        .read_data_source(kind.type_name(), namespace, name)
        .await?;
    print_output(&state, output)
}
