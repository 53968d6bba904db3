//! Inspect command: what the project file resolves to, without touching any network.

use alloy_primitives::{Address, B256};
use serde::Serialize;

use crate::auth::RoleType;
use crate::chain::{auth_address, contract_address, manager_address};
use crate::config::ProjectConfig;
use crate::content::{CommittedConfig, ContentId, LocalContentStore};
use crate::context::AppContext;
use crate::deploy::DeploymentLog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub name: String,
    pub kind: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub name: String,
    pub chain_id: u64,
    pub local: bool,
    pub pending_deployment: Option<B256>,
    pub pending_actions: usize,
    pub last_deployment: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub project: String,
    pub org_id: String,
    pub owners: Vec<Address>,
    pub threshold: u64,
    pub proposers: Vec<Address>,
    pub auth_address: Address,
    pub manager_address: Address,
    pub config_uri: ContentId,
    /// Whether the committed config for `config_uri` is in the local content store.
    pub config_committed: bool,
    pub contracts: Vec<ContractSummary>,
    pub networks: Vec<NetworkSummary>,
}

/// Who the project file lets act in one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSigners {
    pub role: String,
    pub threshold: u64,
    pub signers: Vec<Address>,
}

#[derive(Debug)]
pub struct InspectCommand {
    ctx: AppContext,
}

impl InspectCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn run(&self) -> anyhow::Result<InspectReport> {
        let config = self.ctx.load_config()?;
        let log = self.ctx.deployment_records().load()?;
        build_report(&config, &log, &self.ctx.content_store())
    }

    /// Signer set for a role named on the command line.
    pub fn role_signers(&self, role: &str) -> anyhow::Result<RoleSigners> {
        let role: RoleType = role.parse()?;
        let config = self.ctx.load_config()?;
        Ok(role_signers(&config, role))
    }
}

/// Proposals need a single proposer; every other leaf needs the owner threshold.
pub fn role_signers(config: &ProjectConfig, role: RoleType) -> RoleSigners {
    let options = &config.options;
    let (signers, threshold) = match role {
        RoleType::Owner => (&options.owners, options.threshold),
        RoleType::Proposer => (&options.proposers, 1),
    };
    RoleSigners {
        role: role.to_string(),
        threshold,
        signers: signers.clone(),
    }
}

/// Addresses shown are derived from the file's current owners; after an owner change
/// the live manager keeps the address derived from the previous owners.
pub fn build_report(
    config: &ProjectConfig,
    log: &DeploymentLog,
    content: &LocalContentStore,
) -> anyhow::Result<InspectReport> {
    let project = config.project.as_str();
    let auth = auth_address(
        &config.protocol,
        &config.options.owners,
        config.options.threshold,
        project,
    );
    let manager = manager_address(&config.protocol, auth, project);

    let contracts = config
        .contracts
        .iter()
        .map(|(name, contract)| ContractSummary {
            name: name.clone(),
            kind: format!("{:?}", contract.kind).to_lowercase(),
            address: contract_address(manager, name, contract),
        })
        .collect();

    let networks = config
        .networks
        .iter()
        .map(|(name, network)| {
            let pending = log.plans.get(&network.chain_id);
            NetworkSummary {
                name: name.clone(),
                chain_id: network.chain_id,
                local: network.local,
                pending_deployment: pending.map(|plan| plan.deployment_id()),
                pending_actions: pending.map(|plan| plan.bundle.len()).unwrap_or(0),
                last_deployment: log
                    .latest(network.chain_id)
                    .map(|record| record.deployment_id),
            }
        })
        .collect();

    let config_uri = CommittedConfig::from_project(config).content_id()?;
    let config_committed = content.get(&config_uri)?.is_some();

    Ok(InspectReport {
        project: config.project.clone(),
        org_id: config.options.org_id.clone(),
        owners: config.options.owners.clone(),
        threshold: config.options.threshold,
        proposers: config.options.proposers.clone(),
        auth_address: auth,
        manager_address: manager,
        config_uri,
        config_committed,
        contracts,
        networks,
    })
}
