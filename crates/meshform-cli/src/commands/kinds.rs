//! Kinds command - list supported policy kinds

use console::style;
use meshform_core::PolicyKind;
use serde_json::json;

use crate::error::Result;

pub fn run(json: bool) -> Result<()> {
    if json {
        let kinds: Vec<_> = PolicyKind::ALL
            .iter()
            .map(|k| {
                json!({
                    "kind": k.kind(),
                    "plural": k.plural(),
                    "apiVersion": k.api_version(),
                    "dataSource": k.type_name(),
                    "manifestDataSource": k.manifest_type_name(),
                    "resource": k.type_name(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&kinds)?);
        return Ok(());
    }

    println!("{}", style(meshform_core::API_VERSION).bold());
    for kind in PolicyKind::ALL {
        println!(
            "  {:<28} {}",
            style(kind.kind()).cyan(),
            style(kind.type_name()).dim()
        );
    }
    Ok(())
}
