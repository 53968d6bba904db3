//! Local deployment records.
//!
//! One JSON file per project under `<state_dir>/deployments/`, keyed by a hash of the
//! project root so project directories stay clean. It holds the plans of the last
//! proposal (what `deploy` executes) and the history of completed deployments.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::{Address, B256};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::paths::deployments_dir;
use crate::content::ContentId;
use crate::propose::ChainPlan;

const RECORDS_VERSION: u32 = 1;

/// A deployment that reached COMPLETED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub project: String,
    pub network: String,
    pub chain_id: u64,
    pub manager: Address,
    pub deployment_id: B256,
    pub config_uri: ContentId,
    pub num_actions: usize,
    pub recorded_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub fn from_plan(project: &str, plan: &ChainPlan) -> Self {
        Self {
            project: project.to_string(),
            network: plan.network.clone(),
            chain_id: plan.chain_id,
            manager: plan.manager,
            deployment_id: plan.deployment_id(),
            config_uri: plan.config_uri.clone(),
            num_actions: plan.bundle.len(),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentLog {
    pub version: u32,
    /// Pending plans by chain id. A newer proposal replaces a chain's plan.
    #[serde(default)]
    pub plans: BTreeMap<u64, ChainPlan>,
    #[serde(default)]
    pub history: Vec<DeploymentRecord>,
}

impl Default for DeploymentLog {
    fn default() -> Self {
        Self {
            version: RECORDS_VERSION,
            plans: BTreeMap::new(),
            history: Vec::new(),
        }
    }
}

impl DeploymentLog {
    pub fn plan_for_network(&self, network: &str) -> Option<&ChainPlan> {
        self.plans.values().find(|plan| plan.network == network)
    }

    pub fn latest(&self, chain_id: u64) -> Option<&DeploymentRecord> {
        self.history
            .iter()
            .rev()
            .find(|record| record.chain_id == chain_id)
    }

    pub fn is_recorded(&self, chain_id: u64, deployment_id: B256) -> bool {
        self.history
            .iter()
            .any(|record| record.chain_id == chain_id && record.deployment_id == deployment_id)
    }
}

/// Load/modify/save access to one project's deployment log.
#[derive(Debug, Clone)]
pub struct DeploymentRecords {
    path: PathBuf,
}

impl DeploymentRecords {
    pub fn new(state_dir: &Path, project_root: &Path) -> Self {
        let path = deployments_dir(state_dir).join(format!("{}.json", project_key(project_root)));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns an empty log when nothing has been recorded yet.
    pub fn load(&self) -> anyhow::Result<DeploymentLog> {
        if !self.path.exists() {
            return Ok(DeploymentLog::default());
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read deployment log: {}", self.path.display()))?;
        let log: DeploymentLog = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse deployment log: {}", self.path.display()))?;
        if log.version != RECORDS_VERSION {
            anyhow::bail!(
                "Unsupported deployment log version {} in {}",
                log.version,
                self.path.display()
            );
        }
        Ok(log)
    }

    /// Store the plans of a new proposal. Plans for chains it did not touch stay pending.
    pub fn save_plans(&self, plans: &[ChainPlan]) -> anyhow::Result<()> {
        let mut log = self.load()?;
        for plan in plans {
            log.plans.insert(plan.chain_id, plan.clone());
        }
        self.save(&log)
    }

    /// Append a completed deployment and drop its pending plan.
    ///
    /// Recording the same deployment twice is a no-op.
    pub fn record(&self, record: DeploymentRecord) -> anyhow::Result<bool> {
        let mut log = self.load()?;
        if log.is_recorded(record.chain_id, record.deployment_id) {
            return Ok(false);
        }
        if log
            .plans
            .get(&record.chain_id)
            .is_some_and(|plan| plan.deployment_id() == record.deployment_id)
        {
            log.plans.remove(&record.chain_id);
        }
        debug!(
            chain_id = record.chain_id,
            deployment_id = %record.deployment_id,
            "recording deployment"
        );
        log.history.push(record);
        self.save(&log)?;
        Ok(true)
    }

    /// Write via tmp file and rename.
    fn save(&self, log: &DeploymentLog) -> anyhow::Result<()> {
        let dir = self
            .path
            .parent()
            .context("Deployment log path has no parent directory")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let bytes = serde_json::to_vec_pretty(log).context("Failed to serialize deployment log")?;
        let tmp_path = dir.join(format!("{}.json.tmp", std::process::id()));
        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write tmp log: {}", tmp_path.display()))?;
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove existing log: {}", self.path.display())
            })?;
        }
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to rename tmp log: {}", tmp_path.display()))
    }
}

/// Stable key for a project directory.
///
/// Moving the project gives it a new key and therefore a fresh log.
pub fn project_key(project_root: &Path) -> String {
    let path = fs::canonicalize(project_root).unwrap_or_else(|_| project_root.to_path_buf());
    blake3::hash(path.to_string_lossy().as_bytes())
        .to_hex()
        .to_string()
}
