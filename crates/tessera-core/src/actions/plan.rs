//! Turning the project's contracts into actions for one chain.

use std::collections::BTreeMap;

use super::codec::Action;
use crate::chain::ChainCache;
use crate::config::{ContractConfig, ContractKind};

/// Actions needed to bring a chain in line with `contracts`.
///
/// A contract's address commits to its init code, so a contract already present at its
/// address is up to date and contributes nothing. Proxies that are missing get their
/// implementation deployed, storage written and implementation set; immutables are only
/// deployed. Output is unordered with respect to SetImplementation; bundling reorders.
pub fn plan_actions(
    contracts: &BTreeMap<String, ContractConfig>,
    cache: &ChainCache,
) -> Vec<Action> {
    let mut actions = Vec::new();
    for (reference_name, contract) in contracts {
        if cache.is_deployed(reference_name) {
            continue;
        }

        actions.push(Action::DeployImplementation {
            target: reference_name.clone(),
            code: contract.code.clone(),
        });

        if contract.kind == ContractKind::Proxy {
            actions.extend(contract.storage.iter().map(|slot| Action::SetStorage {
                target: reference_name.clone(),
                key: slot.key,
                value: slot.value,
            }));
            actions.push(Action::SetImplementation {
                target: reference_name.clone(),
            });
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{B256, Bytes};

    use super::*;
    use crate::config::StorageSlot;

    fn contracts() -> BTreeMap<String, ContractConfig> {
        let mut contracts = BTreeMap::new();
        contracts.insert(
            "Token".to_string(),
            ContractConfig {
                kind: ContractKind::Proxy,
                code: Bytes::from_static(&[0x60, 0x80]),
                address: None,
                storage: vec![StorageSlot {
                    key: B256::with_last_byte(1),
                    value: B256::with_last_byte(2),
                }],
            },
        );
        contracts.insert(
            "Registry".to_string(),
            ContractConfig {
                kind: ContractKind::Immutable,
                code: Bytes::from_static(&[0x60, 0x40]),
                address: None,
                storage: Vec::new(),
            },
        );
        contracts
    }

    #[test]
    fn fresh_chain_deploys_everything() {
        let actions = plan_actions(&contracts(), &ChainCache::default());
        let kinds: Vec<_> = actions
            .iter()
            .map(|a| (a.target().to_string(), a.action_type()))
            .collect();
        use crate::actions::ActionType::*;
        assert_eq!(
            kinds,
            vec![
                ("Registry".to_string(), DeployImplementation),
                ("Token".to_string(), DeployImplementation),
                ("Token".to_string(), SetStorage),
                ("Token".to_string(), SetImplementation),
            ]
        );
    }

    #[test]
    fn deployed_contracts_are_skipped() {
        let mut cache = ChainCache::default();
        cache.deployed.insert("Token".to_string(), true);
        cache.deployed.insert("Registry".to_string(), true);
        assert!(plan_actions(&contracts(), &cache).is_empty());
    }
}
