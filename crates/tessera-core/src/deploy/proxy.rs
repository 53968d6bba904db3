//! Moving proxy administration out of and into a project's manager.
//!
//! Both directions are single-signer operations: exporting needs the manager's
//! owner, importing needs the proxy's current EIP-1967 admin.

use alloy_primitives::{Address, B256, b256, keccak256};
use tracing::info;

use super::DeployError;
use super::cancel::ensure_manager_owner;
use crate::chain::{ChainClient, TxReceipt};
use crate::config::ContractKind;

/// `keccak256("eip1967.proxy.admin") - 1`
pub const EIP1967_ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTransfer {
    pub proxy: Address,
    pub new_admin: Address,
    pub receipt: TxReceipt,
}

/// Identifies the proxy flavour to the manager.
pub fn contract_kind_hash(kind: ContractKind) -> B256 {
    let name = match kind {
        ContractKind::Proxy => "proxy",
        ContractKind::Immutable => "immutable",
    };
    keccak256(name.as_bytes())
}

pub async fn proxy_admin(client: &dyn ChainClient, proxy: Address) -> Result<Address, DeployError> {
    let word = client.storage_at(proxy, EIP1967_ADMIN_SLOT).await?;
    Ok(Address::from_word(word))
}

/// Hand a proxy the manager administers to `caller`, who must own the manager.
///
/// Refused while a deployment is active, since the proxy may be mid-upgrade.
pub async fn export_proxy(
    client: &dyn ChainClient,
    chain_id: u64,
    manager: Address,
    proxy: Address,
    kind: ContractKind,
    caller: Address,
) -> Result<ProxyTransfer, DeployError> {
    ensure_manager_owner(client, chain_id, manager, caller).await?;

    let active = client.active_deployment_id(manager).await?;
    if active != B256::ZERO {
        return Err(DeployError::ActiveDeploymentInFlight {
            chain_id,
            manager,
            active,
        });
    }

    let receipt = client
        .export_proxy(manager, proxy, contract_kind_hash(kind), caller)
        .await?;
    if !receipt.success {
        return Err(DeployError::Reverted {
            chain_id,
            call: "exportProxy",
            tx_hash: receipt.tx_hash,
        });
    }
    info!(chain_id, %proxy, new_admin = %caller, "proxy exported");
    Ok(ProxyTransfer {
        proxy,
        new_admin: caller,
        receipt,
    })
}

/// Make `manager` the admin of a proxy `caller` currently administers.
pub async fn import_proxy(
    client: &dyn ChainClient,
    chain_id: u64,
    manager: Address,
    proxy: Address,
    caller: Address,
) -> Result<ProxyTransfer, DeployError> {
    if !client.has_code(proxy).await? {
        return Err(DeployError::ProxyNotDeployed { chain_id, proxy });
    }

    let admin = proxy_admin(client, proxy).await?;
    if admin == manager {
        return Err(DeployError::ProxyAlreadyManaged {
            chain_id,
            proxy,
            manager,
        });
    }
    if admin != caller {
        return Err(DeployError::NotProxyAdmin {
            chain_id,
            proxy,
            admin,
            caller,
        });
    }

    let receipt = client.change_proxy_admin(proxy, manager).await?;
    if !receipt.success {
        return Err(DeployError::Reverted {
            chain_id,
            call: "changeAdmin",
            tx_hash: receipt.tx_hash,
        });
    }
    info!(chain_id, %proxy, %manager, "proxy imported");
    Ok(ProxyTransfer {
        proxy,
        new_admin: manager,
        receipt,
    })
}
