//! Conversion between typed actions and the executor's raw encoding.

use alloy_primitives::{B256, Bytes, U256, keccak256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// Errors raised while decoding raw actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unknown action type {0}")]
    UnknownActionType(u8),

    #[error("malformed SetStorage payload for target '{target}': {reason}")]
    MalformedSetStorage { target: String, reason: String },
}

/// Discriminant the executor contract switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ActionType {
    SetStorage = 0,
    DeployImplementation = 1,
    SetImplementation = 2,
}

impl TryFrom<u8> for ActionType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SetStorage),
            1 => Ok(Self::DeployImplementation),
            2 => Ok(Self::SetImplementation),
            other => Err(CodecError::UnknownActionType(other)),
        }
    }
}

impl From<ActionType> for u8 {
    fn from(value: ActionType) -> Self {
        value as u8
    }
}

/// A single on-chain mutation, addressed by contract reference name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    /// Write a raw storage slot.
    SetStorage { target: String, key: B256, value: B256 },
    /// Deploy init code for the target's implementation.
    DeployImplementation { target: String, code: Bytes },
    /// Point the target at its freshly deployed implementation.
    SetImplementation { target: String },
}

impl Action {
    pub fn target(&self) -> &str {
        match self {
            Action::SetStorage { target, .. }
            | Action::DeployImplementation { target, .. }
            | Action::SetImplementation { target } => target,
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Action::SetStorage { .. } => ActionType::SetStorage,
            Action::DeployImplementation { .. } => ActionType::DeployImplementation,
            Action::SetImplementation { .. } => ActionType::SetImplementation,
        }
    }

    pub fn is_set_implementation(&self) -> bool {
        matches!(self, Action::SetImplementation { .. })
    }
}

/// Fixed-shape action as consumed by the executor contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAction {
    pub action_type: ActionType,
    pub target: String,
    pub data: Bytes,
}

impl RawAction {
    /// `keccak256(abi.encode(string target, uint8 actionType, bytes data))`.
    ///
    /// Must stay byte-for-byte identical to the executor's leaf hash.
    pub fn hash(&self) -> B256 {
        let encoded = (
            self.target.clone(),
            U256::from(u8::from(self.action_type)),
            self.data.clone(),
        )
            .abi_encode_params();
        keccak256(encoded)
    }
}

impl From<&Action> for RawAction {
    fn from(action: &Action) -> Self {
        match action {
            Action::SetStorage { target, key, value } => RawAction {
                action_type: ActionType::SetStorage,
                target: target.clone(),
                data: Bytes::from((*key, *value).abi_encode()),
            },
            Action::DeployImplementation { target, code } => RawAction {
                action_type: ActionType::DeployImplementation,
                target: target.clone(),
                data: code.clone(),
            },
            Action::SetImplementation { target } => RawAction {
                action_type: ActionType::SetImplementation,
                target: target.clone(),
                data: Bytes::new(),
            },
        }
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        RawAction::from(&action)
    }
}

impl TryFrom<&RawAction> for Action {
    type Error = CodecError;

    fn try_from(raw: &RawAction) -> Result<Self, Self::Error> {
        match raw.action_type {
            ActionType::SetStorage => {
                let (key, value) = <(B256, B256)>::abi_decode(&raw.data).map_err(|err| {
                    CodecError::MalformedSetStorage {
                        target: raw.target.clone(),
                        reason: err.to_string(),
                    }
                })?;
                Ok(Action::SetStorage {
                    target: raw.target.clone(),
                    key,
                    value,
                })
            }
            ActionType::DeployImplementation => Ok(Action::DeployImplementation {
                target: raw.target.clone(),
                code: raw.data.clone(),
            }),
            ActionType::SetImplementation => Ok(Action::SetImplementation {
                target: raw.target.clone(),
            }),
        }
    }
}

impl TryFrom<RawAction> for Action {
    type Error = CodecError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        Action::try_from(&raw)
    }
}
