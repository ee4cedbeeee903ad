//! Validate command - check policy manifests without a cluster

use std::path::{Path, PathBuf};

use meshform_core::{Diagnostics, ManifestDocument, split_documents};
use serde_json::json;

use crate::commands::read_file;
use crate::display::ValidationReport;
use crate::error::{CliError, Result};

pub fn run(files: &[PathBuf], json_output: bool) -> Result<()> {
    let mut report = ValidationReport::new();

    for path in files {
        check_file(path, &mut report)?;
    }

    if json_output {
        let (errors, warnings) = report.summary();
        let result = json!({
            "valid": !report.has_errors(),
            "files": files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "validatedCount": report.validated_count,
            "errors": errors,
            "warnings": warnings,
            "issues": report.issues,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report.display();
        if !report.issues.is_empty() {
            println!();
        }
        report.print_summary();
    }

    if report.has_errors() {
        let (errors, _) = report.summary();
        return Err(CliError::validation_with_help(
            format!("{} error(s) found", errors),
            "Run `meshform schema <kind>` to see the accepted fields",
        ));
    }
    Ok(())
}

fn check_file(path: &Path, report: &mut ValidationReport) -> Result<()> {
    let file = path.display().to_string();
    let text = read_file(path)?;

    let documents = match split_documents(&text) {
        Ok(documents) => documents,
        Err(e) => {
            report.add_error(&file, "", "", &e.to_string());
            return Ok(());
        }
    };

    if documents.is_empty() {
        report.add_warning(&file, "", "", "no policy documents found");
        return Ok(());
    }

    for document in &documents {
        report.validated_count += 1;
        check_document(&file, document, report);
    }
    Ok(())
}

fn check_document(file: &str, document: &ManifestDocument, report: &mut ValidationReport) {
    let Err(err) = document.check() else {
        return;
    };

    let name = document.display_name();
    for diagnostic in Diagnostics::from(&err) {
        let path = diagnostic.attribute.clone().unwrap_or_default();
        let message = diagnostic
            .detail
            .strip_prefix(&format!("{}: ", path))
            .unwrap_or(&diagnostic.detail)
            .to_string();
        report.add_error(file, &name, &path, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reports_each_bad_document() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "policies.yaml",
            r#"apiVersion: kuma.io/v1alpha1
kind: MeshTimeout
metadata:
  name: ok
  namespace: kuma-system
spec:
  targetRef:
    kind: Mesh
---
apiVersion: kuma.io/v1alpha1
kind: MeshRetry
metadata:
  name: Bad_Name
spec:
  targetRef:
    kind: Nope
"#,
        );

        let mut report = ValidationReport::new();
        check_file(&path, &mut report).unwrap();
        assert_eq!(report.validated_count, 2);
        assert!(report.has_errors());
        assert!(report.issues.iter().all(|i| i.document == "MeshRetry default/Bad_Name"));
        assert!(report.issues.iter().any(|i| i.path == "metadata.name"));
    }

    #[test]
    fn test_empty_file_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.yaml", "# nothing here\n---\n");

        let mut report = ValidationReport::new();
        check_file(&path, &mut report).unwrap();
        assert_eq!(report.summary(), (0, 1));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut report = ValidationReport::new();
        let err = check_file(Path::new("/nonexistent/policies.yaml"), &mut report).unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::IO_ERROR);
    }
}
