//! Proxy export and import commands.

use alloy_primitives::Address;
use anyhow::Context;

use super::cancel::resolve_manager;
use crate::chain::{ChainClient, RpcChainClient, contract_address};
use crate::config::{ContractKind, DeployerSecrets, ProjectConfig};
use crate::context::AppContext;
use crate::deploy::{ProxyTransfer, export_proxy, import_proxy};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReport {
    pub network: String,
    pub chain_id: u64,
    pub manager: Address,
    pub transfer: ProxyTransfer,
}

#[derive(Debug)]
pub struct ProxyCommand {
    ctx: AppContext,
}

impl ProxyCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    fn client(
        &self,
        config: &ProjectConfig,
        network: &str,
        secrets: &DeployerSecrets,
    ) -> anyhow::Result<RpcChainClient> {
        let network = config.network(network)?;
        Ok(RpcChainClient::with_signer(
            network.rpc_url.clone(),
            secrets.signer.clone(),
        ))
    }

    pub async fn export(
        &self,
        network: &str,
        reference_name: &str,
        secrets: &DeployerSecrets,
    ) -> anyhow::Result<ProxyReport> {
        let config = self.ctx.load_config()?;
        let client = self.client(&config, network, secrets)?;
        self.export_with(&config, network, reference_name, &client, secrets.address())
            .await
    }

    /// Take back administration of the proxy behind `reference_name`.
    pub async fn export_with(
        &self,
        config: &ProjectConfig,
        network: &str,
        reference_name: &str,
        client: &dyn ChainClient,
        caller: Address,
    ) -> anyhow::Result<ProxyReport> {
        let chain_id = config.network(network)?.chain_id;
        let contract = config.contracts.get(reference_name).ok_or_else(|| {
            ConfigError::invalid(format!("no contract named '{}'", reference_name))
        })?;
        if contract.kind != ContractKind::Proxy {
            return Err(ConfigError::invalid(format!(
                "contract '{}' is immutable and has no proxy to export",
                reference_name
            ))
            .into());
        }

        let manager = resolve_manager(&self.ctx, config, chain_id)?;
        let proxy = contract_address(manager, reference_name, contract);
        let transfer = export_proxy(client, chain_id, manager, proxy, contract.kind, caller)
            .await
            .with_context(|| format!("Failed to export '{}' on '{}'", reference_name, network))?;
        Ok(ProxyReport {
            network: network.to_string(),
            chain_id,
            manager,
            transfer,
        })
    }

    pub async fn import(
        &self,
        network: &str,
        proxy: Address,
        secrets: &DeployerSecrets,
    ) -> anyhow::Result<ProxyReport> {
        let config = self.ctx.load_config()?;
        let client = self.client(&config, network, secrets)?;
        self.import_with(&config, network, proxy, &client, secrets.address())
            .await
    }

    /// Hand an existing proxy to the project's manager.
    pub async fn import_with(
        &self,
        config: &ProjectConfig,
        network: &str,
        proxy: Address,
        client: &dyn ChainClient,
        caller: Address,
    ) -> anyhow::Result<ProxyReport> {
        let chain_id = config.network(network)?.chain_id;
        let manager = resolve_manager(&self.ctx, config, chain_id)?;
        let transfer = import_proxy(client, chain_id, manager, proxy, caller)
            .await
            .with_context(|| format!("Failed to import {} on '{}'", proxy, network))?;
        Ok(ProxyReport {
            network: network.to_string(),
            chain_id,
            manager,
            transfer,
        })
    }
}
