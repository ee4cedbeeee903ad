//! CLI commands
//!
//! `kinds`, `schema`, `validate` and `manifest` work offline; the rest talk to
//! the cluster through the provider.

pub mod apply;
pub mod delete;
pub mod get;
pub mod import;
pub mod kinds;
pub mod manifest;
pub mod schema;
pub mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Args;
use meshform_core::PolicyKind;
use meshform_kube::{KubeBackend, Provider, ProviderConfig};
use serde::Serialize;
use tracing::debug;

use crate::OutputFormat;
use crate::error::{CliError, Result};

/// Cluster connection flags, shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ClusterArgs {
    /// Provider configuration file (default: ~/.config/meshform/config.yaml)
    #[arg(long, global = true, env = "MESHFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to a kubeconfig file
    #[arg(long, global = true, env = "MESHFORM_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true, env = "MESHFORM_CONTEXT")]
    pub context: Option<String>,

    /// Field manager recorded on server-side apply
    #[arg(long, global = true, env = "MESHFORM_FIELD_MANAGER")]
    pub field_manager: Option<String>,

    /// Take ownership of conflicting fields on apply
    #[arg(long, global = true, env = "MESHFORM_FORCE_CONFLICTS")]
    pub force_conflicts: bool,
}

impl ClusterArgs {
    /// Provider configuration: file first, then flags
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let base = match &self.config {
            Some(path) => ProviderConfig::load_from(path)?,
            None => ProviderConfig::load()?,
        };
        Ok(base.with_overrides(
            self.kubeconfig.clone(),
            self.context.clone(),
            self.field_manager.clone(),
            self.force_conflicts,
        )?)
    }

    /// Connect to the cluster
    pub async fn provider(&self) -> Result<Provider<KubeBackend>> {
        let config = self.provider_config()?;
        let client = config.client().await?;
        debug!(field_manager = %config.field_manager, "connected to cluster");
        Ok(Provider::new(KubeBackend::new(client), config))
    }
}

/// Resolve a kind argument: kind, plural or type name
pub fn parse_kind(value: &str) -> Result<PolicyKind> {
    Ok(value.parse::<PolicyKind>()?)
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))
}

/// Parse repeated `key=value` arguments
pub fn parse_key_values(flag: &str, values: &[String]) -> Result<Option<BTreeMap<String, String>>> {
    if values.is_empty() {
        return Ok(None);
    }

    let mut map = BTreeMap::new();
    for value in values {
        let (key, val) = value.split_once('=').ok_or_else(|| {
            CliError::usage(
                format!("Invalid --{} '{}'", flag, value),
                format!("Use --{} key=value", flag),
            )
        })?;
        map.insert(key.to_string(), val.to_string());
    }
    Ok(Some(map))
}

/// Print a state object in the requested format
pub fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| CliError::internal(e.to_string()))?,
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_values() {
        assert_eq!(parse_key_values("label", &[]).unwrap(), None);

        let parsed = parse_key_values(
            "label",
            &["app=web".to_string(), "kuma.io/zone=east=1".to_string()],
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed["app"], "web");
        assert_eq!(parsed["kuma.io/zone"], "east=1");

        let err = parse_key_values("label", &["broken".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::USAGE_ERROR);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("meshtimeouts").unwrap(), PolicyKind::MeshTimeout);
        assert_eq!(
            parse_kind("kuma_io_mesh_retry_v1alpha1").unwrap(),
            PolicyKind::MeshRetry
        );
        assert!(parse_kind("MeshGateway").is_err());
    }
}
