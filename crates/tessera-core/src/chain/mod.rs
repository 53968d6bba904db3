//! On-chain collaborators: the manager and authority contracts as seen through RPC.
//!
//! The contracts themselves are a black box. Everything the protocol needs from a
//! network goes through [`ChainClient`], so the driver and orchestrator can be run
//! against an in-memory fake as easily as against a live node.

pub mod addresses;
pub mod bindings;
pub mod rpc;

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::actions::BundledAction;
use crate::config::ContractConfig;

pub use addresses::{auth_address, contract_address, manager_address};
pub use rpc::{RpcChainClient, RpcConnector};

/// Failures talking to a network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("rpc request failed: {0}")]
    Rpc(String),

    #[error("transaction could not be confirmed: {0}")]
    Transaction(String),

    #[error("method '{0}' is not supported by this provider")]
    UnsupportedMethod(String),

    #[error("manager reported unknown deployment status {0}")]
    UnknownStatus(u8),

    #[error("no RPC endpoint configured for chain {0}")]
    UnknownChain(u64),

    #[error("endpoint for chain {expected} is connected to chain {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
}

impl ChainError {
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        ChainError::Rpc(err.to_string())
    }

    pub fn transaction(err: impl std::fmt::Display) -> Self {
        ChainError::Transaction(err.to_string())
    }
}

/// Deployment lifecycle as stored by the manager contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Empty,
    Approved,
    ProxiesInitiated,
    Completed,
    Cancelled,
}

impl TryFrom<u8> for DeploymentStatus {
    type Error = ChainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Approved),
            2 => Ok(Self::ProxiesInitiated),
            3 => Ok(Self::Completed),
            4 => Ok(Self::Cancelled),
            other => Err(ChainError::UnknownStatus(other)),
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeploymentStatus::Empty => "EMPTY",
            DeploymentStatus::Approved => "APPROVED",
            DeploymentStatus::ProxiesInitiated => "PROXIES_INITIATED",
            DeploymentStatus::Completed => "COMPLETED",
            DeploymentStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// Arguments of the manager's `approve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub action_root: B256,
    pub num_actions: u64,
    pub num_deploy_actions: u64,
    pub config_uri: String,
}

impl Approval {
    /// Id the manager stores the approved deployment under.
    pub fn deployment_id(&self) -> B256 {
        crate::actions::deployment_id(
            self.action_root,
            self.num_actions,
            self.num_deploy_actions,
            &self.config_uri,
        )
    }
}

/// Confirmed transaction summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

/// Read and write access to one network.
///
/// Every write returns only after the transaction's receipt is available.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    async fn block_gas_limit(&self) -> Result<u64, ChainError>;

    async fn has_code(&self, address: Address) -> Result<bool, ChainError>;

    /// Next leaf index the authority contract will accept.
    async fn auth_nonce(&self, auth: Address) -> Result<u64, ChainError>;

    async fn deployment_status(
        &self,
        manager: Address,
        deployment_id: B256,
    ) -> Result<DeploymentStatus, ChainError>;

    async fn actions_executed(
        &self,
        manager: Address,
        deployment_id: B256,
    ) -> Result<u64, ChainError>;

    /// Zero when nothing is in flight.
    async fn active_deployment_id(&self, manager: Address) -> Result<B256, ChainError>;

    async fn manager_owner(&self, manager: Address) -> Result<Address, ChainError>;

    async fn approve(
        &self,
        manager: Address,
        approval: &Approval,
    ) -> Result<TxReceipt, ChainError>;

    async fn execute_actions(
        &self,
        manager: Address,
        actions: &[BundledAction],
        gas_limit: u64,
    ) -> Result<TxReceipt, ChainError>;

    async fn cancel_active_deployment(&self, manager: Address) -> Result<TxReceipt, ChainError>;

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError>;

    async fn export_proxy(
        &self,
        manager: Address,
        proxy: Address,
        kind_hash: B256,
        new_owner: Address,
    ) -> Result<TxReceipt, ChainError>;

    /// `changeAdmin` on a proxy the signer administers.
    async fn change_proxy_admin(
        &self,
        proxy: Address,
        new_admin: Address,
    ) -> Result<TxReceipt, ChainError>;

    /// `evm_snapshot`; only dev nodes implement it.
    async fn snapshot(&self) -> Result<String, ChainError>;
}

/// Hands out a client per chain id.
pub trait ChainConnector: Send + Sync {
    fn connect(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, ChainError>;
}

/// Per-chain observations gathered before a bundle is planned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainCache {
    pub chain_id: u64,
    pub network_name: String,
    pub local: bool,
    pub block_gas_limit: u64,
    pub auth_nonce: u64,
    /// Reference name -> whether code already exists at the contract's address.
    pub deployed: BTreeMap<String, bool>,
}

impl ChainCache {
    pub fn is_deployed(&self, reference_name: &str) -> bool {
        self.deployed.get(reference_name).copied().unwrap_or(false)
    }
}

/// Everything [`collect_chain_cache`] needs to know about the target network.
#[derive(Debug, Clone, Copy)]
pub struct CacheRequest<'a> {
    pub network_name: &'a str,
    pub local: bool,
    pub auth: Address,
    pub manager: Address,
    pub contracts: &'a BTreeMap<String, ContractConfig>,
}

/// Query the chain for the state that planning and leaf derivation depend on.
pub async fn collect_chain_cache(
    client: &dyn ChainClient,
    request: CacheRequest<'_>,
) -> Result<ChainCache, ChainError> {
    let chain_id = client.chain_id().await?;
    let block_gas_limit = client.block_gas_limit().await?;
    let auth_nonce = if client.has_code(request.auth).await? {
        client.auth_nonce(request.auth).await?
    } else {
        0
    };

    let mut deployed = BTreeMap::new();
    for (reference_name, contract) in request.contracts {
        let address = contract_address(request.manager, reference_name, contract);
        deployed.insert(reference_name.clone(), client.has_code(address).await?);
    }

    Ok(ChainCache {
        chain_id,
        network_name: request.network_name.to_string(),
        local: request.local,
        block_gas_limit,
        auth_nonce,
        deployed,
    })
}
