//! Application context for dependency injection.

use std::path::{Path, PathBuf};

use url::Url;

use crate::config::paths::{content_dir, default_state_dir};
use crate::config::{ConfigStore, ProjectConfig};
use crate::content::LocalContentStore;
use crate::deploy::DeploymentRecords;
use crate::relay::LocalRelay;

/// Paths and endpoints shared by every command.
///
/// The CLI builds this once and hands it to commands; tests build it over temp dirs.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    state_dir: PathBuf,
    relay_url: Option<Url>,
}

impl AppContext {
    pub fn new(project_root: PathBuf, state_dir: PathBuf) -> Self {
        Self {
            project_root,
            state_dir,
            relay_url: None,
        }
    }

    /// Current directory as project root, platform state directory.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let project_root = std::env::current_dir()?;
        Ok(Self::new(project_root, default_state_dir()?))
    }

    /// Relay endpoint that takes precedence over `[relay]` in the project file.
    pub fn with_relay_url(mut self, relay_url: Option<Url>) -> Self {
        self.relay_url = relay_url;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_project_root(self.project_root.clone())
    }

    pub fn load_config(&self) -> anyhow::Result<ProjectConfig> {
        self.config_store().load()
    }

    /// Relay to talk to, if any. `None` means the local relay.
    pub fn relay_url(&self, config: &ProjectConfig) -> Option<Url> {
        self.relay_url
            .clone()
            .or_else(|| config.relay.as_ref().map(|relay| relay.url.clone()))
    }

    pub fn content_store(&self) -> LocalContentStore {
        LocalContentStore::new(content_dir(&self.state_dir))
    }

    pub fn local_relay(&self) -> LocalRelay {
        LocalRelay::new(&self.state_dir)
    }

    pub fn deployment_records(&self) -> DeploymentRecords {
        DeploymentRecords::new(&self.state_dir, &self.project_root)
    }
}
