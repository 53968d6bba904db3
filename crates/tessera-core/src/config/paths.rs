//! Path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "tessera.toml";

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}

/// Base state directory.
///
/// - Unix: `$XDG_STATE_HOME/tessera` or `~/.local/state/tessera`
/// - Windows: `%LOCALAPPDATA%\tessera`
pub fn default_state_dir() -> anyhow::Result<PathBuf> {
    let base = if cfg!(unix) {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow::anyhow!("Cannot determine state directory"))?
    } else {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine local app data directory"))?
    };
    Ok(base.join("tessera"))
}

pub fn deployments_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("deployments")
}

pub fn content_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("content")
}

/// Canonical configs kept when no relay is configured.
pub fn canonical_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("canonical")
}

pub fn proposals_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("proposals")
}

/// File stem for a project name. The name itself never becomes a path component.
pub fn project_name_key(project: &str) -> String {
    blake3::hash(project.as_bytes()).to_hex().to_string()
}
