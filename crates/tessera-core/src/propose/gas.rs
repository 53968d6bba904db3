//! Heuristic gas figures.
//!
//! Used for the per-chain estimates in a proposal and for sizing execution batches.
//! They are deliberately generous; nothing relies on them being tight.

use crate::actions::{ActionBundle, ActionType, RawAction};
use crate::auth::{AuthLeaf, AuthLeafType};

pub const TX_BASE_GAS: u64 = 21_000;

const SET_STORAGE_GAS: u64 = 45_000;
const SET_IMPLEMENTATION_GAS: u64 = 60_000;
const DEPLOY_BASE_GAS: u64 = 100_000;
/// Code deposit plus calldata per init code byte.
const DEPLOY_GAS_PER_BYTE: u64 = 216;
const PROOF_GAS_PER_SIBLING: u64 = 1_500;

pub fn estimate_action_gas(action: &RawAction, proof_len: usize) -> u64 {
    let execution = match action.action_type {
        ActionType::SetStorage => SET_STORAGE_GAS,
        ActionType::SetImplementation => SET_IMPLEMENTATION_GAS,
        ActionType::DeployImplementation => {
            DEPLOY_BASE_GAS + DEPLOY_GAS_PER_BYTE * action.data.len() as u64
        }
    };
    execution + PROOF_GAS_PER_SIBLING * proof_len as u64
}

pub fn estimate_leaf_gas(leaf: &AuthLeaf) -> u64 {
    match leaf.leaf_type {
        AuthLeafType::Setup => 250_000,
        AuthLeafType::Propose => 80_000,
        AuthLeafType::SetOwner | AuthLeafType::SetProposer | AuthLeafType::SetThreshold => 60_000,
        AuthLeafType::ApproveDeployment => 150_000,
    }
}

/// Everything a chain will spend on this proposal: leaves plus full execution.
pub fn estimate_chain_gas(leaves: &[AuthLeaf], bundle: &ActionBundle) -> u64 {
    let auth: u64 = leaves
        .iter()
        .map(|leaf| TX_BASE_GAS + estimate_leaf_gas(leaf))
        .sum();
    let execution: u64 = bundle
        .actions
        .iter()
        .map(|bundled| estimate_action_gas(&bundled.action, bundled.proof.siblings.len()))
        .sum();
    auth + execution
}
