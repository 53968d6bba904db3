//! Error types shared across the proposal and deployment flows.

use alloy_primitives::Address;

/// Invalid or incomplete configuration. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable '{0}'")]
    MissingSecret(String),

    #[error("environment variable '{name}' is invalid: {reason}")]
    InvalidSecret { name: String, reason: String },

    #[error("organization id cannot be changed (previous: {previous}, new: {new})")]
    OrgIdChanged { previous: String, new: String },

    #[error("invalid role type: {0}")]
    InvalidRole(String),

    #[error("network '{0}' is not defined under [networks]")]
    UnknownNetwork(String),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}

/// Which configuration an eligibility check was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// The project file being proposed.
    New,
    /// The last canonical configuration accepted on chain.
    Previous,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::New => f.write_str("the config file"),
            ConfigSource::Previous => f.write_str("the current on-chain config"),
        }
    }
}

/// The caller may not propose on a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error(
        "signer {signer} is not a proposer in {config} on chain {chain_id}; eligible proposers: [{}]",
        format_addresses(eligible)
    )]
    NotProposer {
        chain_id: u64,
        signer: Address,
        config: ConfigSource,
        eligible: Vec<Address>,
    },
}

fn format_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(Address::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
