//! Content-addressed storage for committed configs.
//!
//! Identifiers are `blake3:<hex>` of the stored bytes. The id is what deployments
//! commit to on chain as their config URI.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::{ContractConfig, ProjectConfig, ProjectOptions};

const SCHEME: &str = "blake3:";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    pub fn of(bytes: &[u8]) -> Self {
        ContentId(format!("{}{}", SCHEME, blake3::hash(bytes).to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(&self) -> &str {
        &self.0[SCHEME.len()..]
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| anyhow::anyhow!("content id must start with '{}': {}", SCHEME, s))?;
        if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("content id digest must be 64 hex characters: {}", s);
        }
        Ok(ContentId(format!("{}{}", SCHEME, digest.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for ContentId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentId> for String {
    fn from(value: ContentId) -> Self {
        value.0
    }
}

/// What a deployment's config URI points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedConfig {
    pub project: String,
    pub options: ProjectOptions,
    pub contracts: BTreeMap<String, ContractConfig>,
}

impl CommittedConfig {
    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            project: config.project.clone(),
            options: config.options.clone(),
            contracts: config.contracts.clone(),
        }
    }

    /// Canonical serialization; maps are ordered so equal configs give equal bytes.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize committed config")
    }

    pub fn content_id(&self) -> anyhow::Result<ContentId> {
        Ok(ContentId::of(&self.to_bytes()?))
    }
}

/// Blobs on disk, one file per content id.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &ContentId) -> PathBuf {
        self.root.join(id.digest())
    }

    pub fn put(&self, bytes: &[u8]) -> anyhow::Result<ContentId> {
        let id = ContentId::of(bytes);
        let path = self.path_for(&id);
        if path.exists() {
            return Ok(id);
        }
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create content directory: {}", self.root.display())
        })?;
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write content: {}", path.display()))?;
        Ok(id)
    }

    pub fn get(&self, id: &ContentId) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read content: {}", path.display()))?;
        if ContentId::of(&bytes) != *id {
            anyhow::bail!("Stored content does not match its id: {}", id);
        }
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_scheme_and_hex_digest() {
        let id = ContentId::of(b"hello");
        assert!(id.as_str().starts_with("blake3:"));
        assert_eq!(id.as_str().len(), "blake3:".len() + 64);
        assert_eq!(id.as_str().parse::<ContentId>().unwrap(), id);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!("sha256:abcd".parse::<ContentId>().is_err());
        assert!("blake3:abcd".parse::<ContentId>().is_err());
    }

    #[test]
    fn store_round_trips_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().join("content"));
        let id = store.put(b"{\"a\":1}").unwrap();
        assert_eq!(store.get(&id).unwrap().as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(store.get(&ContentId::of(b"missing")).unwrap(), None);
    }

    #[test]
    fn tampered_blob_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::new(dir.path().to_path_buf());
        let id = store.put(b"original").unwrap();
        fs::write(dir.path().join(id.digest()), b"changed").unwrap();
        assert!(store.get(&id).is_err());
    }
}
