//! Merkle-committed action bundles.

use alloy_primitives::{B256, U256, keccak256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use super::codec::{Action, ActionType, RawAction};
use crate::merkle::{MerkleTree, verify_proof};

/// Inclusion proof for one bundled action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionProof {
    pub action_index: usize,
    pub siblings: Vec<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundledAction {
    pub action: RawAction,
    pub proof: ActionProof,
}

impl BundledAction {
    pub fn verify(&self, root: B256) -> bool {
        verify_proof(
            root,
            self.action.hash(),
            self.proof.action_index,
            &self.proof.siblings,
        )
    }
}

/// Actions in execution order, committed under `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBundle {
    pub root: B256,
    pub actions: Vec<BundledAction>,
}

impl ActionBundle {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Number of DeployImplementation actions, reported to the manager on approval.
    pub fn num_deploy_actions(&self) -> usize {
        self.actions
            .iter()
            .filter(|bundled| bundled.action.action_type == ActionType::DeployImplementation)
            .count()
    }

    /// Recompute the root from the bundled actions and check every proof.
    pub fn verify(&self) -> bool {
        let hashes: Vec<B256> = self.actions.iter().map(|a| a.action.hash()).collect();
        if MerkleTree::from_leaves(&hashes).root() != self.root {
            return false;
        }
        self.actions
            .iter()
            .enumerate()
            .all(|(index, bundled)| {
                bundled.proof.action_index == index && bundled.verify(self.root)
            })
    }

    /// Identifier the manager contract stores the deployment under.
    ///
    /// `keccak256(abi.encode(bytes32 root, uint256 numActions, uint256 numDeployActions,
    /// string configUri))`.
    pub fn deployment_id(&self, config_uri: &str) -> B256 {
        deployment_id(
            self.root,
            self.len() as u64,
            self.num_deploy_actions() as u64,
            config_uri,
        )
    }
}

pub fn deployment_id(
    action_root: B256,
    num_actions: u64,
    num_deploy_actions: u64,
    config_uri: &str,
) -> B256 {
    let encoded = (
        action_root,
        U256::from(num_actions),
        U256::from(num_deploy_actions),
        config_uri.to_string(),
    )
        .abi_encode_params();
    keccak256(encoded)
}

/// Stable partition: SetImplementation actions move behind everything else.
///
/// Relative order inside each group is preserved; this is not a sort.
pub fn order_actions(actions: Vec<Action>) -> Vec<Action> {
    let (mut ordered, set_implementations): (Vec<Action>, Vec<Action>) = actions
        .into_iter()
        .partition(|action| !action.is_set_implementation());
    ordered.extend(set_implementations);
    ordered
}

/// Order, encode, hash and commit a list of actions.
pub fn make_action_bundle(actions: Vec<Action>) -> ActionBundle {
    let raw_actions: Vec<RawAction> = order_actions(actions)
        .iter()
        .map(RawAction::from)
        .collect();
    let hashes: Vec<B256> = raw_actions.iter().map(RawAction::hash).collect();
    let tree = MerkleTree::from_leaves(&hashes);

    let actions = raw_actions
        .into_iter()
        .enumerate()
        .map(|(action_index, action)| BundledAction {
            action,
            proof: ActionProof {
                action_index,
                siblings: tree.proof(action_index).unwrap_or_default(),
            },
        })
        .collect();

    ActionBundle {
        root: tree.root(),
        actions,
    }
}
