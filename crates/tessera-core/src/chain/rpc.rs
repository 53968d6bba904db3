//! alloy-backed [`ChainClient`].

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, TransactionReceipt};
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::bindings::{self, AdminProxy, Authority, DeploymentManager};
use super::{Approval, ChainClient, ChainConnector, ChainError, DeploymentStatus, TxReceipt};
use crate::actions::BundledAction;

const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC client for a single network.
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
}

impl RpcChainClient {
    /// Client that signs writes with `signer`.
    pub fn with_signer(rpc_url: Url, signer: PrivateKeySigner) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url)
            .erased();
        Self { provider }
    }

    /// Client that can only read; writes fail at submission.
    pub fn read_only(rpc_url: Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        Self { provider }
    }

    fn manager(
        &self,
        address: Address,
    ) -> DeploymentManager::DeploymentManagerInstance<DynProvider> {
        DeploymentManager::new(address, self.provider.clone())
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient").finish_non_exhaustive()
    }
}

fn to_receipt(receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        tx_hash: receipt.transaction_hash(),
        block_number: receipt.block_number().unwrap_or_default(),
        gas_used: receipt.gas_used(),
        success: receipt.status(),
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(ChainError::rpc)
    }

    async fn block_gas_limit(&self) -> Result<u64, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(ChainError::rpc)?
            .ok_or_else(|| ChainError::rpc("latest block not available"))?;
        Ok(block.header.gas_limit)
    }

    async fn has_code(&self, address: Address) -> Result<bool, ChainError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(ChainError::rpc)?;
        Ok(!code.is_empty())
    }

    async fn auth_nonce(&self, auth: Address) -> Result<u64, ChainError> {
        let nonce: U256 = Authority::new(auth, self.provider.clone())
            .authNonce()
            .call()
            .await
            .map_err(ChainError::rpc)?;
        Ok(nonce.saturating_to())
    }

    async fn deployment_status(
        &self,
        manager: Address,
        deployment_id: B256,
    ) -> Result<DeploymentStatus, ChainError> {
        let raw = self
            .manager(manager)
            .deploymentStatus(deployment_id)
            .call()
            .await
            .map_err(ChainError::rpc)?;
        DeploymentStatus::try_from(raw)
    }

    async fn actions_executed(
        &self,
        manager: Address,
        deployment_id: B256,
    ) -> Result<u64, ChainError> {
        let executed: U256 = self
            .manager(manager)
            .actionsExecuted(deployment_id)
            .call()
            .await
            .map_err(ChainError::rpc)?;
        Ok(executed.saturating_to())
    }

    async fn active_deployment_id(&self, manager: Address) -> Result<B256, ChainError> {
        self.manager(manager)
            .activeDeploymentId()
            .call()
            .await
            .map_err(ChainError::rpc)
    }

    async fn manager_owner(&self, manager: Address) -> Result<Address, ChainError> {
        self.manager(manager)
            .owner()
            .call()
            .await
            .map_err(ChainError::rpc)
    }

    async fn approve(
        &self,
        manager: Address,
        approval: &Approval,
    ) -> Result<TxReceipt, ChainError> {
        let receipt = self
            .manager(manager)
            .approve(
                approval.action_root,
                U256::from(approval.num_actions),
                U256::from(approval.num_deploy_actions),
                approval.config_uri.clone(),
            )
            .send()
            .await
            .map_err(ChainError::transaction)?
            .get_receipt()
            .await
            .map_err(ChainError::transaction)?;
        Ok(to_receipt(&receipt))
    }

    async fn execute_actions(
        &self,
        manager: Address,
        actions: &[BundledAction],
        gas_limit: u64,
    ) -> Result<TxReceipt, ChainError> {
        let raw: Vec<bindings::RawAction> = actions
            .iter()
            .map(|bundled| bindings::RawAction::from(&bundled.action))
            .collect();
        let indexes: Vec<U256> = actions
            .iter()
            .map(|bundled| U256::from(bundled.proof.action_index))
            .collect();
        let proofs: Vec<Vec<B256>> = actions
            .iter()
            .map(|bundled| bundled.proof.siblings.clone())
            .collect();

        debug!(%manager, count = actions.len(), gas_limit, "submitting executeActions");
        let receipt = self
            .manager(manager)
            .executeActions(raw, indexes, proofs)
            .gas(gas_limit)
            .send()
            .await
            .map_err(ChainError::transaction)?
            .get_receipt()
            .await
            .map_err(ChainError::transaction)?;
        Ok(to_receipt(&receipt))
    }

    async fn cancel_active_deployment(&self, manager: Address) -> Result<TxReceipt, ChainError> {
        let receipt = self
            .manager(manager)
            .cancelActiveDeployment()
            .send()
            .await
            .map_err(ChainError::transaction)?
            .get_receipt()
            .await
            .map_err(ChainError::transaction)?;
        Ok(to_receipt(&receipt))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        let word = self
            .provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map_err(ChainError::rpc)?;
        Ok(B256::from(word.to_be_bytes::<32>()))
    }

    async fn export_proxy(
        &self,
        manager: Address,
        proxy: Address,
        kind_hash: B256,
        new_owner: Address,
    ) -> Result<TxReceipt, ChainError> {
        let receipt = self
            .manager(manager)
            .exportProxy(proxy, kind_hash, new_owner)
            .send()
            .await
            .map_err(ChainError::transaction)?
            .get_receipt()
            .await
            .map_err(ChainError::transaction)?;
        Ok(to_receipt(&receipt))
    }

    async fn change_proxy_admin(
        &self,
        proxy: Address,
        new_admin: Address,
    ) -> Result<TxReceipt, ChainError> {
        let receipt = AdminProxy::new(proxy, self.provider.clone())
            .changeAdmin(new_admin)
            .send()
            .await
            .map_err(ChainError::transaction)?
            .get_receipt()
            .await
            .map_err(ChainError::transaction)?;
        Ok(to_receipt(&receipt))
    }

    async fn snapshot(&self) -> Result<String, ChainError> {
        self.provider
            .raw_request::<(), String>("evm_snapshot".into(), ())
            .await
            .map_err(|err| match err.as_error_resp() {
                Some(payload) if payload.code == METHOD_NOT_FOUND => {
                    ChainError::UnsupportedMethod("evm_snapshot".to_string())
                }
                _ => ChainError::rpc(err),
            })
    }
}

/// Opens [`RpcChainClient`]s from a chain id -> endpoint table.
#[derive(Debug, Clone, Default)]
pub struct RpcConnector {
    endpoints: BTreeMap<u64, Url>,
    signer: Option<PrivateKeySigner>,
}

impl RpcConnector {
    pub fn new(endpoints: BTreeMap<u64, Url>) -> Self {
        Self {
            endpoints,
            signer: None,
        }
    }

    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        self.signer = Some(signer);
        self
    }
}

impl ChainConnector for RpcConnector {
    fn connect(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, ChainError> {
        let url = self
            .endpoints
            .get(&chain_id)
            .cloned()
            .ok_or(ChainError::UnknownChain(chain_id))?;
        let client = match &self.signer {
            Some(signer) => RpcChainClient::with_signer(url, signer.clone()),
            None => RpcChainClient::read_only(url),
        };
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_chain_is_reported() {
        let connector = RpcConnector::new(BTreeMap::new());
        let err = connector.connect(31337).err();
        assert_eq!(err, Some(ChainError::UnknownChain(31337)));
    }

    #[test]
    fn known_chain_connects_without_network_io() {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(31337, Url::parse("http://127.0.0.1:8545").unwrap());
        let connector = RpcConnector::new(endpoints);
        assert!(connector.connect(31337).is_ok());
    }
}
