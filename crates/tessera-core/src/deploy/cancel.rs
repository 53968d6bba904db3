//! Cancelling the deployment a manager is currently executing.

use alloy_primitives::{Address, B256};
use tracing::info;

use super::DeployError;
use crate::chain::{ChainClient, TxReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled {
        deployment_id: B256,
        receipt: TxReceipt,
    },
    NothingToCancel,
}

/// Cancel the active deployment on `manager`. Only the manager's owner may do this.
pub async fn cancel_active_deployment(
    client: &dyn ChainClient,
    chain_id: u64,
    manager: Address,
    caller: Address,
) -> Result<CancelOutcome, DeployError> {
    ensure_manager_owner(client, chain_id, manager, caller).await?;

    let deployment_id = client.active_deployment_id(manager).await?;
    if deployment_id == B256::ZERO {
        info!(chain_id, %manager, "no active deployment");
        return Ok(CancelOutcome::NothingToCancel);
    }

    let receipt = client.cancel_active_deployment(manager).await?;
    if !receipt.success {
        return Err(DeployError::Reverted {
            chain_id,
            call: "cancelActiveDeployment",
            tx_hash: receipt.tx_hash,
        });
    }
    info!(chain_id, %deployment_id, tx = %receipt.tx_hash, "deployment cancelled");
    Ok(CancelOutcome::Cancelled {
        deployment_id,
        receipt,
    })
}

pub(crate) async fn ensure_manager_owner(
    client: &dyn ChainClient,
    chain_id: u64,
    manager: Address,
    caller: Address,
) -> Result<(), DeployError> {
    let owner = client.manager_owner(manager).await?;
    if owner != caller {
        return Err(DeployError::NotOwner {
            chain_id,
            owner,
            caller,
        });
    }
    Ok(())
}
