//! Wire model of a proposal as sent to the relay.

use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

use crate::auth::AuthLeafType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRequest {
    pub api_key: String,
    pub org_id: String,
    pub is_testnet: bool,
    pub chain_ids: Vec<u64>,
    pub deployment_name: String,
    pub owners: Vec<Address>,
    pub threshold: u64,
    pub auth_address: Address,
    pub deployer_address: Address,
    /// JSON-encoded [`crate::config::CanonicalConfig`].
    pub canonical_config: String,
    pub project_deployments: Vec<ProjectDeployment>,
    pub gas_estimates: Vec<GasEstimate>,
    pub tree: ProposalTree,
}

impl ProposalRequest {
    /// Copy safe to print or log.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: "<redacted>".to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalTree {
    pub root: B256,
    pub chain_status: Vec<ChainStatus>,
    pub leaves: Vec<ProposalRequestLeaf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub chain_id: u64,
    pub num_leaves: usize,
}

/// A deployment that becomes executable once its ApproveDeployment leaf lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDeployment {
    pub chain_id: u64,
    pub deployment_id: B256,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub chain_id: u64,
    pub estimated_gas: u64,
}

/// Auth leaf with its proof and the signatures it still needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRequestLeaf {
    pub chain_id: u64,
    pub index: u64,
    pub to: Address,
    pub leaf_type: AuthLeafType,
    pub data: Bytes,
    pub siblings: Vec<B256>,
    pub threshold: u64,
    pub signers: Vec<Signer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_copy_hides_api_key() {
        let request = ProposalRequest {
            api_key: "secret".to_string(),
            org_id: "org".to_string(),
            is_testnet: true,
            chain_ids: vec![1],
            deployment_name: "Example".to_string(),
            owners: Vec::new(),
            threshold: 1,
            auth_address: Address::ZERO,
            deployer_address: Address::ZERO,
            canonical_config: "{}".to_string(),
            project_deployments: Vec::new(),
            gas_estimates: Vec::new(),
            tree: ProposalTree {
                root: B256::ZERO,
                chain_status: Vec::new(),
                leaves: Vec::new(),
            },
        };
        let json = serde_json::to_string(&request.redacted()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"apiKey\""));
        assert!(json.contains("\"deployerAddress\""));
    }
}
