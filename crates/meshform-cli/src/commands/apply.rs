//! Apply command - create or update policies from manifest files

use std::path::PathBuf;

use console::style;
use meshform_core::{ManifestDocument, split_documents};
use meshform_kube::ResourcePlan;

use crate::commands::{ClusterArgs, read_file};
use crate::error::Result;

pub async fn run(cluster: &ClusterArgs, files: &[PathBuf]) -> Result<()> {
    // Parse and check everything before the first write
    let mut documents: Vec<ManifestDocument> = Vec::new();
    for path in files {
        let text = read_file(path)?;
        for document in split_documents(&text)? {
            document.check()?;
            documents.push(document);
        }
    }

    if documents.is_empty() {
        println!("{} No policy documents to apply", style("⚠").yellow());
        return Ok(());
    }

    let provider = cluster.provider().await?;

    for document in documents {
        let name = document.display_name();
        let plan = ResourcePlan::new(document.metadata, document.spec);
        let state = provider.create(document.kind.type_name(), plan).await?;
        println!(
            "{} {} applied (field manager {})",
            style("✓").green().bold(),
            style(name).cyan(),
            state.field_manager
        );
    }
    Ok(())
}
