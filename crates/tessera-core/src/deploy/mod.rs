//! Deployment execution: approve, execute in batches, complete.

pub mod cancel;
pub mod driver;
pub mod executor;
pub mod proxy;
pub mod records;

use alloy_primitives::{Address, B256};

use crate::chain::{ChainError, DeploymentStatus};

pub use cancel::{CancelOutcome, cancel_active_deployment};
pub use driver::{DeploymentDriver, DriveOutcome, post_deployment};
pub use executor::{BatchedExecutor, ExecutionEngine, ExecutionReport, ExecutionTarget};
pub use proxy::{ProxyTransfer, export_proxy, import_proxy, proxy_admin};
pub use records::{DeploymentLog, DeploymentRecord, DeploymentRecords};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    #[error("chain {chain_id}: deployment {deployment_id} was cancelled")]
    Cancelled { chain_id: u64, deployment_id: B256 },

    #[error("chain {chain_id}: manager {manager} is still executing deployment {active}")]
    ActiveDeploymentInFlight {
        chain_id: u64,
        manager: Address,
        active: B256,
    },

    #[error("chain {chain_id}: {call} reverted in {tx_hash}")]
    Reverted {
        chain_id: u64,
        call: &'static str,
        tx_hash: B256,
    },

    #[error("chain {chain_id}: execution failed: {reason}")]
    ExecutionFailed { chain_id: u64, reason: String },

    #[error("chain {chain_id}: deployment ended in {status}, expected COMPLETED")]
    NotCompleted {
        chain_id: u64,
        status: DeploymentStatus,
    },

    #[error("chain {chain_id}: only the manager owner {owner} may do this, not {caller}")]
    NotOwner {
        chain_id: u64,
        owner: Address,
        caller: Address,
    },

    #[error("chain {chain_id}: no proxy deployed at {proxy}")]
    ProxyNotDeployed { chain_id: u64, proxy: Address },

    #[error("chain {chain_id}: proxy {proxy} is already administered by manager {manager}")]
    ProxyAlreadyManaged {
        chain_id: u64,
        proxy: Address,
        manager: Address,
    },

    #[error("chain {chain_id}: proxy {proxy} is administered by {admin}, not {caller}")]
    NotProxyAdmin {
        chain_id: u64,
        proxy: Address,
        admin: Address,
        caller: Address,
    },

    #[error("chain {chain_id}: action bundle does not match its root")]
    InvalidBundle { chain_id: u64 },

    #[error("failed to record deployment: {0}")]
    Records(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
