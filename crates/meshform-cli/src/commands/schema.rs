//! Schema command - print the spec schema or CRD of a kind

use crate::commands::parse_kind;
use crate::error::{CliError, Result};

pub fn run(kind: &str, crd: bool) -> Result<()> {
    let kind = parse_kind(kind)?;

    let text = if crd {
        serde_yaml::to_string(&kind.crd()).map_err(|e| CliError::internal(e.to_string()))?
    } else {
        serde_json::to_string_pretty(&kind.spec_schema())
            .map_err(|e| CliError::internal(e.to_string()))?
    };
    println!("{}", text.trim_end());
    Ok(())
}
