//! In-memory stand-ins for networks and the relay.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;

use tessera_core::actions::BundledAction;
use tessera_core::chain::{
    Approval, ChainClient, ChainConnector, ChainError, DeploymentStatus, TxReceipt,
};
use tessera_core::config::{CanonicalConfig, ProjectConfig, ProposerSecrets, parse_project_toml_str};
use tessera_core::content::CommittedConfig;
use tessera_core::deploy::proxy::EIP1967_ADMIN_SLOT;
use tessera_core::propose::ProposalRequest;
use tessera_core::relay::{CanonicalConfigSource, RelayClient, RelayError};

/// First anvil dev account.
pub const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const CHAIN_ID: u64 = 31337;
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const BLOCK_GAS_LIMIT: u64 = 30_000_000;

pub fn anvil_signer() -> PrivateKeySigner {
    ANVIL_KEY.parse().unwrap()
}

pub fn anvil_address() -> Address {
    anvil_signer().address()
}

pub fn proposer_secrets() -> ProposerSecrets {
    ProposerSecrets::from_lookup(|name| match name {
        "TESSERA_API_KEY" => Some("test-api-key".to_string()),
        "PROPOSER_PRIVATE_KEY" => Some(ANVIL_KEY.to_string()),
        _ => None,
    })
    .unwrap()
}

fn address_list(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(|address| format!("\"{}\"", address))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Project with one proxy (one storage slot) on a local anvil network.
pub fn project_toml(owners: &[Address], threshold: u64, proposers: &[Address]) -> String {
    format!(
        r#"
project = "Example"

[options]
org_id = "org-1"
owners = [{owners}]
threshold = {threshold}
proposers = [{proposers}]
testnets = ["anvil"]

[networks.anvil]
chain_id = 31337
rpc_url = "http://127.0.0.1:8545"
local = true

[contracts.Token]
kind = "proxy"
code = "0x6080604052348015600e575f80fd5b50"
storage = [
  {{ key = "0x0000000000000000000000000000000000000000000000000000000000000001", value = "0x00000000000000000000000000000000000000000000000000000000000004d2" }},
]

[protocol]
auth_factory = "0x000000000000000000000000000000000000a001"
auth_init_code_hash = "0x1111111111111111111111111111111111111111111111111111111111111111"
manager_factory = "0x000000000000000000000000000000000000a002"
manager_init_code_hash = "0x2222222222222222222222222222222222222222222222222222222222222222"
"#,
        owners = address_list(owners),
        threshold = threshold,
        proposers = address_list(proposers),
    )
}

/// Same project targeting anvil, then sepolia.
pub fn two_chain_toml(owners: &[Address], threshold: u64, proposers: &[Address]) -> String {
    let mut toml = project_toml(owners, threshold, proposers)
        .replace(r#"testnets = ["anvil"]"#, r#"testnets = ["anvil", "sepolia"]"#);
    toml.push_str(
        r#"
[networks.sepolia]
chain_id = 11155111
rpc_url = "https://sepolia.example"
"#,
    );
    toml
}

/// The anvil account owns and proposes.
pub fn fixture_config() -> ProjectConfig {
    let me = anvil_address();
    parse_project_toml_str(&project_toml(&[me], 1, &[me])).unwrap()
}

#[derive(Debug, Default)]
struct FakeState {
    statuses: HashMap<B256, DeploymentStatus>,
    executed: HashMap<B256, u64>,
    totals: HashMap<B256, u64>,
    active: B256,
    code: HashSet<Address>,
    auth_nonce: u64,
    owner: Address,
    proxy_admins: HashMap<Address, Address>,
    transactions: usize,
    batches: Vec<usize>,
    fail_on_batch: Option<usize>,
    snapshot_supported: bool,
}

/// A manager contract and its chain, in memory.
#[derive(Debug)]
pub struct FakeChain {
    chain_id: u64,
    block_gas_limit: u64,
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            block_gas_limit: BLOCK_GAS_LIMIT,
            state: Mutex::new(FakeState {
                snapshot_supported: true,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_block_gas_limit(mut self, block_gas_limit: u64) -> Self {
        self.block_gas_limit = block_gas_limit;
        self
    }

    pub fn set_status(&self, deployment_id: B256, status: DeploymentStatus) {
        self.state.lock().unwrap().statuses.insert(deployment_id, status);
    }

    pub fn set_active(&self, deployment_id: B256) {
        self.state.lock().unwrap().active = deployment_id;
    }

    pub fn set_owner(&self, owner: Address) {
        self.state.lock().unwrap().owner = owner;
    }

    /// Deploy a proxy administered by `admin`.
    pub fn set_proxy_admin(&self, proxy: Address, admin: Address) {
        let mut state = self.state.lock().unwrap();
        state.code.insert(proxy);
        state.proxy_admins.insert(proxy, admin);
    }

    pub fn proxy_admin(&self, proxy: Address) -> Option<Address> {
        self.state.lock().unwrap().proxy_admins.get(&proxy).copied()
    }

    pub fn deploy_code(&self, address: Address) {
        self.state.lock().unwrap().code.insert(address);
    }

    pub fn set_auth_nonce(&self, nonce: u64) {
        self.state.lock().unwrap().auth_nonce = nonce;
    }

    /// Revert the `index`-th executeActions call from now on (0-based, counted overall).
    pub fn fail_on_batch(&self, index: Option<usize>) {
        self.state.lock().unwrap().fail_on_batch = index;
    }

    pub fn disable_snapshots(&self) {
        self.state.lock().unwrap().snapshot_supported = false;
    }

    pub fn transactions(&self) -> usize {
        self.state.lock().unwrap().transactions
    }

    /// Sizes of successful executeActions batches, in order.
    pub fn batches(&self) -> Vec<usize> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn status(&self, deployment_id: B256) -> DeploymentStatus {
        self.state
            .lock()
            .unwrap()
            .statuses
            .get(&deployment_id)
            .copied()
            .unwrap_or(DeploymentStatus::Empty)
    }

    pub fn executed(&self, deployment_id: B256) -> u64 {
        self.state
            .lock()
            .unwrap()
            .executed
            .get(&deployment_id)
            .copied()
            .unwrap_or(0)
    }

    fn receipt(state: &mut FakeState, success: bool) -> TxReceipt {
        state.transactions += 1;
        TxReceipt {
            tx_hash: B256::with_last_byte(state.transactions as u8),
            block_number: state.transactions as u64,
            gas_used: 100_000,
            success,
        }
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.chain_id)
    }

    async fn block_gas_limit(&self) -> Result<u64, ChainError> {
        Ok(self.block_gas_limit)
    }

    async fn has_code(&self, address: Address) -> Result<bool, ChainError> {
        Ok(self.state.lock().unwrap().code.contains(&address))
    }

    async fn auth_nonce(&self, _auth: Address) -> Result<u64, ChainError> {
        Ok(self.state.lock().unwrap().auth_nonce)
    }

    async fn deployment_status(
        &self,
        _manager: Address,
        deployment_id: B256,
    ) -> Result<DeploymentStatus, ChainError> {
        Ok(self.status(deployment_id))
    }

    async fn actions_executed(
        &self,
        _manager: Address,
        deployment_id: B256,
    ) -> Result<u64, ChainError> {
        Ok(self.executed(deployment_id))
    }

    async fn active_deployment_id(&self, _manager: Address) -> Result<B256, ChainError> {
        Ok(self.state.lock().unwrap().active)
    }

    async fn manager_owner(&self, _manager: Address) -> Result<Address, ChainError> {
        Ok(self.state.lock().unwrap().owner)
    }

    async fn approve(
        &self,
        _manager: Address,
        approval: &Approval,
    ) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        let id = approval.deployment_id();
        state.statuses.insert(id, DeploymentStatus::Approved);
        state.totals.insert(id, approval.num_actions);
        state.active = id;
        Ok(Self::receipt(&mut state, true))
    }

    async fn execute_actions(
        &self,
        _manager: Address,
        actions: &[BundledAction],
        _gas_limit: u64,
    ) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        let call = state.batches.len();
        if state.fail_on_batch == Some(call) {
            return Ok(Self::receipt(&mut state, false));
        }

        let id = state.active;
        let done = state.executed.get(&id).copied().unwrap_or(0) + actions.len() as u64;
        let total = state.totals.get(&id).copied().unwrap_or(done);
        state.executed.insert(id, done);
        state.batches.push(actions.len());
        let status = if done >= total {
            state.active = B256::ZERO;
            DeploymentStatus::Completed
        } else {
            DeploymentStatus::ProxiesInitiated
        };
        state.statuses.insert(id, status);
        Ok(Self::receipt(&mut state, true))
    }

    async fn cancel_active_deployment(&self, _manager: Address) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        let id = state.active;
        state.statuses.insert(id, DeploymentStatus::Cancelled);
        state.active = B256::ZERO;
        Ok(Self::receipt(&mut state, true))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        let state = self.state.lock().unwrap();
        match state.proxy_admins.get(&address) {
            Some(admin) if slot == EIP1967_ADMIN_SLOT => Ok(admin.into_word()),
            _ => Ok(B256::ZERO),
        }
    }

    async fn export_proxy(
        &self,
        _manager: Address,
        proxy: Address,
        _kind_hash: B256,
        new_owner: Address,
    ) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.proxy_admins.insert(proxy, new_owner);
        Ok(Self::receipt(&mut state, true))
    }

    async fn change_proxy_admin(
        &self,
        proxy: Address,
        new_admin: Address,
    ) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.proxy_admins.insert(proxy, new_admin);
        Ok(Self::receipt(&mut state, true))
    }

    async fn snapshot(&self) -> Result<String, ChainError> {
        if self.state.lock().unwrap().snapshot_supported {
            Ok("0x1".to_string())
        } else {
            Err(ChainError::UnsupportedMethod("evm_snapshot".to_string()))
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeConnector {
    chains: BTreeMap<u64, Arc<FakeChain>>,
}

impl FakeConnector {
    pub fn with_chain(mut self, chain: Arc<FakeChain>) -> Self {
        self.chains.insert(chain.chain_id, chain);
        self
    }
}

impl ChainConnector for FakeConnector {
    fn connect(&self, chain_id: u64) -> Result<Arc<dyn ChainClient>, ChainError> {
        let chain = self
            .chains
            .get(&chain_id)
            .cloned()
            .ok_or(ChainError::UnknownChain(chain_id))?;
        Ok(chain)
    }
}

/// Relay that keeps what it was sent.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    proposals: Mutex<Vec<ProposalRequest>>,
    configs: Mutex<Vec<CommittedConfig>>,
}

impl RecordingRelay {
    pub fn proposals(&self) -> Vec<ProposalRequest> {
        self.proposals.lock().unwrap().clone()
    }

    pub fn configs(&self) -> Vec<CommittedConfig> {
        self.configs.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayClient for RecordingRelay {
    async fn relay_proposal(&self, request: &ProposalRequest) -> Result<(), RelayError> {
        self.proposals.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn relay_configs(
        &self,
        _api_key: &str,
        _org_id: &str,
        configs: &[CommittedConfig],
    ) -> Result<(), RelayError> {
        self.configs.lock().unwrap().extend_from_slice(configs);
        Ok(())
    }
}

/// Canonical config source with a fixed answer.
#[derive(Debug, Default)]
pub struct StaticCanonical(pub Option<CanonicalConfig>);

#[async_trait]
impl CanonicalConfigSource for StaticCanonical {
    async fn fetch(
        &self,
        _api_key: &str,
        _project: &str,
    ) -> Result<Option<CanonicalConfig>, RelayError> {
        Ok(self.0.clone())
    }
}
