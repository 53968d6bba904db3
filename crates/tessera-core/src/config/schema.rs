//! Configuration schema for tessera.toml
//!
//! ```toml
//! project = "MyProject"
//!
//! [options]
//! org_id = "org-1"
//! owners = ["0x…"]
//! threshold = 1
//! proposers = ["0x…"]
//! testnets = ["sepolia"]
//! mainnets = ["ethereum"]
//!
//! [networks.sepolia]
//! chain_id = 11155111
//! rpc_url = "https://…"
//!
//! [contracts.Token]
//! kind = "proxy"
//! code = "0x6080…"
//! storage = [{ key = "0x…", value = "0x…" }]
//!
//! [protocol]
//! auth_factory = "0x…"
//! auth_init_code_hash = "0x…"
//! manager_factory = "0x…"
//! manager_init_code_hash = "0x…"
//! ```

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Root of tessera.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name; part of every CREATE2 salt.
    pub project: String,

    pub options: ProjectOptions,

    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,

    /// Contracts keyed by reference name.
    #[serde(default)]
    pub contracts: BTreeMap<String, ContractConfig>,

    pub protocol: ProtocolConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<RelayConfig>,
}

/// Ownership and targeting options.
///
/// Serialized camelCase because the same value is embedded in the canonical config JSON;
/// snake_case keys are accepted in the project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOptions {
    #[serde(alias = "org_id")]
    pub org_id: String,

    pub owners: Vec<Address>,

    /// Owner signatures required for owner-level leaves.
    pub threshold: u64,

    #[serde(default)]
    pub proposers: Vec<Address>,

    #[serde(default)]
    pub testnets: Vec<String>,

    #[serde(default)]
    pub mainnets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: Url,
    /// Dev node (anvil/hardhat); enables post-deployment snapshots.
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Upgradeable: implementation is deployed, then wired in with SetImplementation.
    Proxy,
    /// Deployed once, never touched again.
    Immutable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub kind: ContractKind,

    /// Init code.
    pub code: Bytes,

    /// Pin the contract to an existing address instead of the manager's CREATE2 address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage: Vec<StorageSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSlot {
    pub key: B256,
    pub value: B256,
}

/// Factory addresses and init code hashes of the protocol contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub auth_factory: Address,
    pub auth_init_code_hash: B256,
    pub manager_factory: Address,
    pub manager_init_code_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub url: Url,
}

impl ProjectConfig {
    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::invalid("project name must not be empty"));
        }

        self.options.validate()?;

        let mut chain_ids = BTreeSet::new();
        for (name, network) in &self.networks {
            if !chain_ids.insert(network.chain_id) {
                return Err(ConfigError::invalid(format!(
                    "chain id {} is used by more than one network (second: '{}')",
                    network.chain_id, name
                )));
            }
        }

        for name in self.options.testnets.iter().chain(&self.options.mainnets) {
            if !self.networks.contains_key(name) {
                return Err(ConfigError::UnknownNetwork(name.clone()));
            }
        }

        for (reference_name, contract) in &self.contracts {
            if contract.code.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "contract '{}' has no init code",
                    reference_name
                )));
            }
            if contract.kind == ContractKind::Immutable && !contract.storage.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "contract '{}' is immutable; storage can only be set on proxies",
                    reference_name
                )));
            }
        }

        Ok(())
    }

    /// Networks targeted by a testnet or mainnet proposal, in declaration order.
    pub fn target_networks(
        &self,
        is_testnet: bool,
    ) -> Result<Vec<(&str, &NetworkConfig)>, ConfigError> {
        let names = if is_testnet {
            &self.options.testnets
        } else {
            &self.options.mainnets
        };
        names
            .iter()
            .map(|name| {
                self.networks
                    .get_key_value(name)
                    .map(|(name, network)| (name.as_str(), network))
                    .ok_or_else(|| ConfigError::UnknownNetwork(name.clone()))
            })
            .collect()
    }

    pub fn network(&self, name: &str) -> Result<&NetworkConfig, ConfigError> {
        self.networks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    /// Chain id -> RPC endpoint for every declared network.
    pub fn endpoints(&self) -> BTreeMap<u64, Url> {
        self.networks
            .values()
            .map(|network| (network.chain_id, network.rpc_url.clone()))
            .collect()
    }
}

impl ProjectOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.org_id.trim().is_empty() {
            return Err(ConfigError::invalid("options.org_id must not be empty"));
        }
        if self.owners.is_empty() {
            return Err(ConfigError::invalid("options.owners must list at least one owner"));
        }
        let owner_count = self.owners.len() as u64;
        if self.threshold == 0 || self.threshold > owner_count {
            return Err(ConfigError::invalid(format!(
                "options.threshold must be between 1 and {} (number of owners), got {}",
                owner_count, self.threshold
            )));
        }
        check_unique("owners", &self.owners)?;
        check_unique("proposers", &self.proposers)?;
        Ok(())
    }
}

fn check_unique(field: &str, addresses: &[Address]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for address in addresses {
        if !seen.insert(*address) {
            return Err(ConfigError::invalid(format!(
                "options.{} contains {} more than once",
                field, address
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ProjectOptions {
        ProjectOptions {
            org_id: "org".to_string(),
            owners: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            threshold: 2,
            proposers: vec![Address::repeat_byte(3)],
            testnets: Vec::new(),
            mainnets: Vec::new(),
        }
    }

    #[test]
    fn threshold_must_fit_owner_count() {
        let mut opts = options();
        opts.threshold = 3;
        assert!(opts.validate().is_err());
        opts.threshold = 0;
        assert!(opts.validate().is_err());
        opts.threshold = 1;
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn duplicate_proposers_are_rejected() {
        let mut opts = options();
        opts.proposers.push(Address::repeat_byte(3));
        let err = opts.validate().unwrap_err();
        assert!(err.to_string().contains("proposers"));
    }

    #[test]
    fn empty_proposer_list_is_allowed() {
        let mut opts = options();
        opts.proposers.clear();
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn options_serialize_camel_case() {
        let json = serde_json::to_value(options()).unwrap();
        assert!(json.get("orgId").is_some());
        assert!(json.get("org_id").is_none());
    }
}
