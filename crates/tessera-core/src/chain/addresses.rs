//! Deterministic CREATE2 addresses for the authority, manager and project contracts.

use alloy_primitives::{Address, U256, keccak256};
use alloy_sol_types::SolValue;

use crate::config::{ContractConfig, ProtocolConfig};

/// Authority contract for an owner set.
///
/// Salt: `keccak256(abi.encode(address[] owners, uint256 threshold, string project))`.
pub fn auth_address(
    protocol: &ProtocolConfig,
    owners: &[Address],
    threshold: u64,
    project: &str,
) -> Address {
    let salt = keccak256(
        (owners.to_vec(), U256::from(threshold), project.to_string()).abi_encode_params(),
    );
    protocol
        .auth_factory
        .create2(salt.0, protocol.auth_init_code_hash.0)
}

/// Manager (deployer) contract owned by `auth`.
pub fn manager_address(protocol: &ProtocolConfig, auth: Address, project: &str) -> Address {
    let salt = keccak256((auth, project.to_string()).abi_encode_params());
    protocol
        .manager_factory
        .create2(salt.0, protocol.manager_init_code_hash.0)
}

/// Address a contract lives at: the pinned address, or where the manager deploys it.
pub fn contract_address(
    manager: Address,
    reference_name: &str,
    contract: &ContractConfig,
) -> Address {
    contract.address.unwrap_or_else(|| {
        let salt = keccak256(reference_name.as_bytes());
        manager.create2(salt.0, keccak256(&contract.code).0)
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{B256, Bytes, address};

    use super::*;
    use crate::config::ContractKind;

    fn protocol() -> ProtocolConfig {
        ProtocolConfig {
            auth_factory: address!("00000000000000000000000000000000000a0001"),
            auth_init_code_hash: B256::repeat_byte(0x11),
            manager_factory: address!("00000000000000000000000000000000000a0002"),
            manager_init_code_hash: B256::repeat_byte(0x22),
        }
    }

    #[test]
    fn auth_address_depends_on_owner_set_and_threshold() {
        let owners = [Address::repeat_byte(1), Address::repeat_byte(2)];
        let base = auth_address(&protocol(), &owners, 1, "Project");
        assert_eq!(base, auth_address(&protocol(), &owners, 1, "Project"));
        assert_ne!(base, auth_address(&protocol(), &owners, 2, "Project"));
        assert_ne!(base, auth_address(&protocol(), &owners[..1], 1, "Project"));
        assert_ne!(base, auth_address(&protocol(), &owners, 1, "Other"));
    }

    #[test]
    fn manager_address_depends_on_auth() {
        let a = manager_address(&protocol(), Address::repeat_byte(1), "Project");
        let b = manager_address(&protocol(), Address::repeat_byte(2), "Project");
        assert_ne!(a, b);
    }

    #[test]
    fn pinned_contract_address_wins() {
        let pinned = Address::repeat_byte(9);
        let contract = ContractConfig {
            kind: ContractKind::Proxy,
            code: Bytes::from_static(&[0x60, 0x80]),
            address: Some(pinned),
            storage: Vec::new(),
        };
        assert_eq!(contract_address(Address::ZERO, "Token", &contract), pinned);

        let unpinned = ContractConfig {
            address: None,
            ..contract
        };
        assert_ne!(contract_address(Address::ZERO, "Token", &unpinned), pinned);
    }
}
