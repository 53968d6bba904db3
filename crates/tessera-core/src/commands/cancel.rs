//! Cancel command implementation.

use alloy_primitives::Address;
use anyhow::Context;

use crate::chain::{ChainClient, RpcChainClient, auth_address, manager_address};
use crate::config::{DeployerSecrets, ProjectConfig};
use crate::context::AppContext;
use crate::deploy::{CancelOutcome, cancel_active_deployment};

#[derive(Debug, Clone)]
pub struct CancelOptions {
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReport {
    pub network: String,
    pub chain_id: u64,
    pub manager: Address,
    pub outcome: CancelOutcome,
}

#[derive(Debug)]
pub struct CancelCommand {
    ctx: AppContext,
}

impl CancelCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        options: &CancelOptions,
        secrets: &DeployerSecrets,
    ) -> anyhow::Result<CancelReport> {
        let config = self.ctx.load_config()?;
        let network = config.network(&options.network)?;
        let client = RpcChainClient::with_signer(network.rpc_url.clone(), secrets.signer.clone());
        self.run_with(&config, options, &client, secrets.address())
            .await
    }

    pub async fn run_with(
        &self,
        config: &ProjectConfig,
        options: &CancelOptions,
        client: &dyn ChainClient,
        caller: Address,
    ) -> anyhow::Result<CancelReport> {
        let chain_id = config.network(&options.network)?.chain_id;
        let manager = resolve_manager(&self.ctx, config, chain_id)?;
        let outcome = cancel_active_deployment(client, chain_id, manager, caller)
            .await
            .with_context(|| format!("Failed to cancel deployment on '{}'", options.network))?;
        Ok(CancelReport {
            network: options.network.clone(),
            chain_id,
            manager,
            outcome,
        })
    }
}

/// Manager of the pending plan, else of the last recorded deployment, else the one
/// derived from the current owners.
pub(crate) fn resolve_manager(
    ctx: &AppContext,
    config: &ProjectConfig,
    chain_id: u64,
) -> anyhow::Result<Address> {
    let log = ctx.deployment_records().load()?;
    if let Some(plan) = log.plans.get(&chain_id) {
        return Ok(plan.manager);
    }
    if let Some(record) = log.latest(chain_id) {
        return Ok(record.manager);
    }
    let auth = auth_address(
        &config.protocol,
        &config.options.owners,
        config.options.threshold,
        &config.project,
    );
    Ok(manager_address(&config.protocol, auth, &config.project))
}
