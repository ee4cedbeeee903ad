//! Provider configuration
//!
//! Read from `~/.config/meshform/config.yaml` when present; command line flags
//! override individual fields on top of it.

use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::ApplyOptions;
use crate::error::{KubeError, Result};

/// Field manager recorded on server-side apply when none is configured
pub const DEFAULT_FIELD_MANAGER: &str = "meshform";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Path to a kubeconfig file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default = "default_field_manager")]
    pub field_manager: String,

    /// Take ownership of fields managed by someone else on apply
    #[serde(default)]
    pub force_conflicts: bool,
}

fn default_field_manager() -> String {
    DEFAULT_FIELD_MANAGER.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            field_manager: default_field_manager(),
            force_conflicts: false,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.check()?;
        debug!(path = %path.display(), "loaded provider configuration");
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            KubeError::InvalidConfig("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("meshform").join("config.yaml"))
    }

    fn check(&self) -> Result<()> {
        if self.field_manager.trim().is_empty() {
            return Err(KubeError::InvalidConfig(
                "fieldManager must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply command line overrides; `None` keeps the configured value
    pub fn with_overrides(
        mut self,
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
        field_manager: Option<String>,
        force_conflicts: bool,
    ) -> Result<Self> {
        if kubeconfig.is_some() {
            self.kubeconfig = kubeconfig;
        }
        if context.is_some() {
            self.context = context;
        }
        if let Some(field_manager) = field_manager {
            self.field_manager = field_manager;
        }
        self.force_conflicts |= force_conflicts;
        self.check()?;
        Ok(self)
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            field_manager: self.field_manager.clone(),
            force: self.force_conflicts,
        }
    }

    /// Build a Kubernetes client.
    ///
    /// An explicit kubeconfig file wins; a context alone selects from the
    /// default kubeconfig; otherwise the in-cluster or default configuration
    /// is inferred.
    pub async fn client(&self) -> Result<Client> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };

        let config = match (&self.kubeconfig, &self.context) {
            (Some(path), _) => {
                debug!(path = %path.display(), context = ?self.context, "using kubeconfig file");
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            (None, Some(context)) => {
                debug!(%context, "using default kubeconfig");
                Config::from_kubeconfig(&options).await?
            }
            (None, None) => Config::infer().await?,
        };

        Ok(Client::try_from(config)?)
    }
}
