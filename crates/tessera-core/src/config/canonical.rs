//! The last configuration accepted for a project, as stored by the relay.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::schema::{ContractConfig, ProjectConfig, ProjectOptions};

/// Per-chain progress flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    pub first_proposal_occurred: bool,
    pub project_created: bool,
}

impl ChainState {
    pub const PROPOSED: ChainState = ChainState {
        first_proposal_occurred: true,
        project_created: true,
    };
}

/// Canonical configuration.
///
/// Read-only outside the orchestrator; a new value is produced per proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalConfig {
    /// Manager contract address.
    pub deployer: Address,
    pub options: ProjectOptions,
    pub contracts: BTreeMap<String, ContractConfig>,
    pub project: String,
    #[serde(default)]
    pub chain_states: BTreeMap<u64, ChainState>,
}

impl CanonicalConfig {
    /// Stand-in used when no canonical config exists yet: the new options and no chain history.
    pub fn synthesize(config: &ProjectConfig, deployer: Address) -> Self {
        Self {
            deployer,
            options: config.options.clone(),
            contracts: config.contracts.clone(),
            project: config.project.clone(),
            chain_states: BTreeMap::new(),
        }
    }

    pub fn chain_state(&self, chain_id: u64) -> ChainState {
        self.chain_states.get(&chain_id).copied().unwrap_or_default()
    }

    pub fn first_proposal_occurred(&self, chain_id: u64) -> bool {
        self.chain_state(chain_id).first_proposal_occurred
    }

    /// Successor after proposing `config` on `chain_ids`.
    ///
    /// Chain states of chains not in this proposal are carried over unchanged.
    pub fn successor(&self, config: &ProjectConfig, chain_ids: &[u64]) -> Self {
        let mut chain_states = self.chain_states.clone();
        for chain_id in chain_ids {
            chain_states.insert(*chain_id, ChainState::PROPOSED);
        }
        Self {
            deployer: self.deployer,
            options: config.options.clone(),
            contracts: config.contracts.clone(),
            project: config.project.clone(),
            chain_states,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("Failed to serialize canonical config")
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse canonical config")
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;
    use crate::config::ProtocolConfig;

    fn project() -> ProjectConfig {
        ProjectConfig {
            project: "Example".to_string(),
            options: ProjectOptions {
                org_id: "org".to_string(),
                owners: vec![Address::repeat_byte(1)],
                threshold: 1,
                proposers: vec![Address::repeat_byte(2)],
                testnets: Vec::new(),
                mainnets: Vec::new(),
            },
            networks: BTreeMap::new(),
            contracts: BTreeMap::new(),
            protocol: ProtocolConfig {
                auth_factory: Address::ZERO,
                auth_init_code_hash: B256::ZERO,
                manager_factory: Address::ZERO,
                manager_init_code_hash: B256::ZERO,
            },
            relay: None,
        }
    }

    #[test]
    fn synthesized_config_has_no_history() {
        let canonical = CanonicalConfig::synthesize(&project(), Address::repeat_byte(9));
        assert!(canonical.chain_states.is_empty());
        assert!(!canonical.first_proposal_occurred(1));
    }

    #[test]
    fn successor_merges_chain_states() {
        let mut previous = CanonicalConfig::synthesize(&project(), Address::repeat_byte(9));
        previous.chain_states.insert(5, ChainState::PROPOSED);

        let next = previous.successor(&project(), &[10]);
        assert!(next.first_proposal_occurred(5));
        assert!(next.first_proposal_occurred(10));
        assert_eq!(next.deployer, previous.deployer);
    }

    #[test]
    fn json_uses_camel_case_and_string_chain_keys() {
        let mut canonical = CanonicalConfig::synthesize(&project(), Address::ZERO);
        canonical.chain_states.insert(10, ChainState::PROPOSED);
        let value: serde_json::Value = serde_json::from_str(&canonical.to_json().unwrap()).unwrap();
        assert_eq!(value["chainStates"]["10"]["firstProposalOccurred"], true);
        assert_eq!(value["options"]["orgId"], "org");

        let parsed = CanonicalConfig::from_json(&canonical.to_json().unwrap()).unwrap();
        assert_eq!(parsed, canonical);
    }
}
