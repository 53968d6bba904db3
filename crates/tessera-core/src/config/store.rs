//! Config store for loading tessera.toml.

use std::path::PathBuf;

use super::{ProjectConfig, parser, paths::config_path};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_project_root(project_root: PathBuf) -> Self {
        Self {
            config_path: config_path(&project_root),
        }
    }

    pub fn load(&self) -> anyhow::Result<ProjectConfig> {
        if !self.config_path.exists() {
            anyhow::bail!(
                "No project file found at {}",
                self.config_path.display()
            );
        }
        parser::parse_project_toml(&self.config_path)
    }
}
