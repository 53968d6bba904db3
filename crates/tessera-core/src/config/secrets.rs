//! Secrets read from the environment.
//!
//! Lookups go through a closure so callers (and tests) never mutate the process
//! environment.

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::Address;
use url::Url;

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "TESSERA_API_KEY";
pub const PROPOSER_KEY_VAR: &str = "PROPOSER_PRIVATE_KEY";
pub const DEPLOYER_KEY_VAR: &str = "DEPLOYER_PRIVATE_KEY";
pub const RELAY_URL_VAR: &str = "TESSERA_RELAY_URL";

fn require<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(name.to_string()))
}

fn signer<F>(lookup: &F, name: &str) -> Result<PrivateKeySigner, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    require(lookup, name)?
        .parse::<PrivateKeySigner>()
        .map_err(|err| ConfigError::InvalidSecret {
            name: name.to_string(),
            reason: err.to_string(),
        })
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Credentials needed to propose.
#[derive(Clone)]
pub struct ProposerSecrets {
    pub api_key: String,
    pub signer: PrivateKeySigner,
}

impl ProposerSecrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: require(&lookup, API_KEY_VAR)?,
            signer: signer(&lookup, PROPOSER_KEY_VAR)?,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl std::fmt::Debug for ProposerSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposerSecrets")
            .field("api_key", &"<redacted>")
            .field("signer", &self.signer.address())
            .finish()
    }
}

/// Key that submits approve/execute/cancel transactions.
#[derive(Clone)]
pub struct DeployerSecrets {
    pub signer: PrivateKeySigner,
}

impl DeployerSecrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            signer: signer(&lookup, DEPLOYER_KEY_VAR)?,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl std::fmt::Debug for DeployerSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployerSecrets")
            .field("signer", &self.signer.address())
            .finish()
    }
}

/// Relay endpoint override from the environment, if set.
pub fn relay_url_override<F>(lookup: F) -> Result<Option<Url>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(RELAY_URL_VAR).filter(|value| !value.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => Url::parse(raw.trim())
            .map(Some)
            .map_err(|err| ConfigError::InvalidSecret {
                name: RELAY_URL_VAR.to_string(),
                reason: err.to_string(),
            }),
    }
}

pub fn relay_url_from_env() -> Result<Option<Url>, ConfigError> {
    relay_url_override(env_lookup)
}
