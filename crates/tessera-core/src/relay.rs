//! Relay service and canonical-config sources.
//!
//! The relay collects signatures, submits auth leaves on chain and keeps the canonical
//! config of every project. Without a relay URL the same operations are served from the
//! local state directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::CanonicalConfig;
use crate::config::paths::{canonical_dir, content_dir, project_name_key, proposals_dir};
use crate::content::{CommittedConfig, LocalContentStore};
use crate::propose::ProposalRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(String),

    #[error("relay rejected {endpoint} with status {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid relay response: {0}")]
    Decode(String),

    #[error("local relay storage failed: {0}")]
    Storage(String),
}

/// Receives proposals and committed configs.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn relay_proposal(&self, request: &ProposalRequest) -> Result<(), RelayError>;

    async fn relay_configs(
        &self,
        api_key: &str,
        org_id: &str,
        configs: &[CommittedConfig],
    ) -> Result<(), RelayError>;
}

/// Where the previous canonical config comes from.
#[async_trait]
pub trait CanonicalConfigSource: Send + Sync {
    /// `None` when the project has never been proposed.
    async fn fetch(
        &self,
        api_key: &str,
        project: &str,
    ) -> Result<Option<CanonicalConfig>, RelayError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigsBody<'a> {
    api_key: &'a str,
    org_id: &'a str,
    configs: &'a [CommittedConfig],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalConfigQuery<'a> {
    api_key: &'a str,
    project_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalConfigResponse {
    #[serde(default)]
    canonical_config: Option<CanonicalConfig>,
}

/// JSON-over-HTTP relay.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpRelayClient {
    pub fn new(base_url: Url) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tessera/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| RelayError::Http(err.to_string()))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RelayError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, path)).map_err(|err| RelayError::Http(err.to_string()))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, RelayError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| RelayError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn relay_proposal(&self, request: &ProposalRequest) -> Result<(), RelayError> {
        let response = self.post("proposal", request).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::Rejected {
                endpoint: "proposal".to_string(),
                status: 404,
                body: String::new(),
            });
        }
        info!(root = %request.tree.root, "proposal relayed");
        Ok(())
    }

    async fn relay_configs(
        &self,
        api_key: &str,
        org_id: &str,
        configs: &[CommittedConfig],
    ) -> Result<(), RelayError> {
        let body = ConfigsBody {
            api_key,
            org_id,
            configs,
        };
        let response = self.post("configs", &body).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::Rejected {
                endpoint: "configs".to_string(),
                status: 404,
                body: String::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CanonicalConfigSource for HttpRelayClient {
    async fn fetch(
        &self,
        api_key: &str,
        project: &str,
    ) -> Result<Option<CanonicalConfig>, RelayError> {
        let query = CanonicalConfigQuery {
            api_key,
            project_name: project,
        };
        let response = self.post("canonical-config", &query).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let parsed: CanonicalConfigResponse = response
            .json()
            .await
            .map_err(|err| RelayError::Decode(err.to_string()))?;
        Ok(parsed.canonical_config)
    }
}

/// Canonical configs kept as JSON files in the state directory.
#[derive(Debug, Clone)]
pub struct LocalCanonicalStore {
    dir: PathBuf,
}

impl LocalCanonicalStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, project: &str) -> PathBuf {
        self.dir.join(format!("{}.json", project_name_key(project)))
    }

    pub fn load(&self, project: &str) -> anyhow::Result<Option<CanonicalConfig>> {
        let path = self.path_for(project);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read canonical config: {}", path.display()))?;
        CanonicalConfig::from_json(&json).map(Some)
    }

    pub fn save(&self, config: &CanonicalConfig) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        let path = self.path_for(&config.project);
        let json = serde_json::to_string_pretty(config)
            .context("Failed to serialize canonical config")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write canonical config: {}", path.display()))
    }
}

#[async_trait]
impl CanonicalConfigSource for LocalCanonicalStore {
    async fn fetch(
        &self,
        _api_key: &str,
        project: &str,
    ) -> Result<Option<CanonicalConfig>, RelayError> {
        self.load(project)
            .map_err(|err| RelayError::Storage(format!("{err:#}")))
    }
}

/// Relay stand-in for local networks: accepted proposals advance the local canonical
/// config and committed configs land in the content store.
#[derive(Debug, Clone)]
pub struct LocalRelay {
    proposals_dir: PathBuf,
    canonical: LocalCanonicalStore,
    content: LocalContentStore,
}

impl LocalRelay {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            proposals_dir: proposals_dir(state_dir),
            canonical: LocalCanonicalStore::new(canonical_dir(state_dir)),
            content: LocalContentStore::new(content_dir(state_dir)),
        }
    }

    fn store_proposal(&self, request: &ProposalRequest) -> anyhow::Result<()> {
        let canonical = CanonicalConfig::from_json(&request.canonical_config)?;
        fs::create_dir_all(&self.proposals_dir).with_context(|| {
            format!(
                "Failed to create directory: {}",
                self.proposals_dir.display()
            )
        })?;
        let path = self
            .proposals_dir
            .join(format!("{}.json", request.tree.root));
        let json = serde_json::to_string_pretty(&request.redacted())
            .context("Failed to serialize proposal")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write proposal: {}", path.display()))?;
        self.canonical.save(&canonical)
    }
}

#[async_trait]
impl RelayClient for LocalRelay {
    async fn relay_proposal(&self, request: &ProposalRequest) -> Result<(), RelayError> {
        self.store_proposal(request)
            .map_err(|err| RelayError::Storage(format!("{err:#}")))?;
        info!(root = %request.tree.root, "proposal stored locally");
        Ok(())
    }

    async fn relay_configs(
        &self,
        _api_key: &str,
        _org_id: &str,
        configs: &[CommittedConfig],
    ) -> Result<(), RelayError> {
        for config in configs {
            let bytes = config
                .to_bytes()
                .map_err(|err| RelayError::Storage(format!("{err:#}")))?;
            self.content
                .put(&bytes)
                .map_err(|err| RelayError::Storage(format!("{err:#}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CanonicalConfigSource for LocalRelay {
    async fn fetch(
        &self,
        api_key: &str,
        project: &str,
    ) -> Result<Option<CanonicalConfig>, RelayError> {
        self.canonical.fetch(api_key, project).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let url = Url::parse("https://relay.example/api/").unwrap();
        let client = HttpRelayClient::new(url).unwrap();
        assert_eq!(
            client.endpoint("proposal").unwrap().as_str(),
            "https://relay.example/api/proposal"
        );
    }

    #[tokio::test]
    async fn local_canonical_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCanonicalStore::new(dir.path().to_path_buf());
        assert_eq!(store.fetch("key", "Example").await.unwrap(), None);
    }

    #[test]
    fn canonical_files_stay_inside_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCanonicalStore::new(dir.path().join("canonical"));
        for name in ["../escape", "a/b", "/etc/passwd"] {
            let path = store.path_for(name);
            assert_eq!(path.parent(), Some(dir.path().join("canonical").as_path()));
        }
    }
}
