//! Project configuration.
//!
//! - `tessera.toml`: the declarative project file, owned by the user
//! - canonical config: the last configuration accepted on chain, owned by the orchestrator
//! - secrets: API key and private keys, read from the environment

pub mod canonical;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod secrets;
pub mod store;

pub use canonical::{CanonicalConfig, ChainState};
pub use parser::{parse_project_toml, parse_project_toml_str};
pub use schema::{
    ContractConfig, ContractKind, NetworkConfig, ProjectConfig, ProjectOptions, ProtocolConfig,
    RelayConfig, StorageSlot,
};
pub use secrets::{DeployerSecrets, ProposerSecrets};
pub use store::ConfigStore;
