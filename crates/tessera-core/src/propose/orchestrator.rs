//! Builds, signs and relays a proposal across every target chain.

use alloy_primitives::{Address, B256};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::gas::estimate_chain_gas;
use super::request::{
    ChainStatus, GasEstimate, ProjectDeployment, ProposalRequest, ProposalRequestLeaf,
    ProposalTree,
};
use crate::actions::{ActionBundle, make_action_bundle, plan_actions};
use crate::auth::{
    AuthLeaf, AuthorityContext, LeafDerivation, SigningError, check_org_id, derive_auth_leaves,
    make_auth_bundle, sign_auth_root,
};
use crate::chain::{
    Approval, CacheRequest, ChainConnector, ChainError, auth_address, collect_chain_cache,
    manager_address,
};
use crate::config::{CanonicalConfig, NetworkConfig, ProjectConfig, ProposerSecrets};
use crate::content::{CommittedConfig, ContentId};
use crate::error::{AuthorizationError, ConfigError};
use crate::relay::{CanonicalConfigSource, RelayClient, RelayError};

#[derive(Debug, thiserror::Error)]
pub enum ProposeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("chain {chain_id}: {source}")]
    Chain {
        chain_id: u64,
        #[source]
        source: ChainError,
    },

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("no {0} networks are listed in the project options")]
    NoNetworks(&'static str),

    #[error("failed to commit project config: {0}")]
    Commit(String),
}

impl ProposeError {
    fn chain(chain_id: u64) -> impl FnOnce(ChainError) -> Self {
        move |source| ProposeError::Chain { chain_id, source }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProposeOptions {
    pub is_testnet: bool,
    /// Validate and build everything, but neither sign nor relay.
    pub dry_run: bool,
}

/// What a chain will execute once its proposal is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainPlan {
    pub chain_id: u64,
    pub network: String,
    pub auth: Address,
    pub manager: Address,
    pub config_uri: ContentId,
    pub bundle: ActionBundle,
}

impl ChainPlan {
    pub fn deployment_id(&self) -> B256 {
        self.bundle.deployment_id(self.config_uri.as_str())
    }

    pub fn approval(&self) -> Approval {
        Approval {
            action_root: self.bundle.root,
            num_actions: self.bundle.len() as u64,
            num_deploy_actions: self.bundle.num_deploy_actions() as u64,
            config_uri: self.config_uri.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProposalReport {
    pub request: ProposalRequest,
    pub canonical: CanonicalConfig,
    pub committed: CommittedConfig,
    pub config_uri: ContentId,
    /// Chains with actions to execute, in proposal order.
    pub plans: Vec<ChainPlan>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub enum ProposeOutcome {
    Proposed(Box<ProposalReport>),
    /// Every target chain already matches the project file.
    UpToDate,
}

/// Per-chain result gathered before the barrier.
struct ChainProposal {
    plan: ChainPlan,
    leaves: Vec<AuthLeaf>,
    deployment: Option<ProjectDeployment>,
    gas: GasEstimate,
}

/// Values shared by every chain of one proposal.
struct ProposalScope<'a> {
    config: &'a ProjectConfig,
    context: AuthorityContext<'a>,
    caller: Address,
    auth: Address,
    manager: Address,
    config_uri: &'a ContentId,
}

pub struct ProposalOrchestrator<'a> {
    connector: &'a dyn ChainConnector,
    canonical_source: &'a dyn CanonicalConfigSource,
    relay: &'a dyn RelayClient,
}

impl<'a> ProposalOrchestrator<'a> {
    pub fn new(
        connector: &'a dyn ChainConnector,
        canonical_source: &'a dyn CanonicalConfigSource,
        relay: &'a dyn RelayClient,
    ) -> Self {
        Self {
            connector,
            canonical_source,
            relay,
        }
    }

    pub async fn propose(
        &self,
        config: &ProjectConfig,
        secrets: &ProposerSecrets,
        options: ProposeOptions,
    ) -> Result<ProposeOutcome, ProposeError> {
        config.validate()?;
        let caller = secrets.address();
        let project = config.project.as_str();

        let fetched = self.canonical_source.fetch(&secrets.api_key, project).await?;
        let is_new_config = fetched.is_none();
        let previous = match fetched {
            Some(previous) => {
                check_org_id(&previous, &config.options)?;
                previous
            }
            None => {
                let auth = auth_address(
                    &config.protocol,
                    &config.options.owners,
                    config.options.threshold,
                    project,
                );
                let manager = manager_address(&config.protocol, auth, project);
                CanonicalConfig::synthesize(config, manager)
            }
        };

        let auth = auth_address(
            &config.protocol,
            &previous.options.owners,
            previous.options.threshold,
            project,
        );
        let manager = previous.deployer;

        let networks = config.target_networks(options.is_testnet)?;
        if networks.is_empty() {
            return Err(ProposeError::NoNetworks(if options.is_testnet {
                "testnet"
            } else {
                "mainnet"
            }));
        }

        let committed = CommittedConfig::from_project(config);
        let config_uri = committed
            .content_id()
            .map_err(|err| ProposeError::Commit(format!("{err:#}")))?;

        info!(
            %project,
            %caller,
            %auth,
            %manager,
            is_new_config,
            chains = networks.len(),
            "preparing proposal"
        );

        let scope = ProposalScope {
            config,
            context: AuthorityContext::new(&previous, &config.options),
            caller,
            auth,
            manager,
            config_uri: &config_uri,
        };
        let chains = try_join_all(
            networks
                .iter()
                .map(|(name, network)| self.prepare_chain(&scope, name, network)),
        )
        .await?;

        let chain_ids: Vec<u64> = chains.iter().map(|chain| chain.plan.chain_id).collect();
        let leaves: Vec<AuthLeaf> = chains
            .iter()
            .flat_map(|chain| chain.leaves.iter().cloned())
            .collect();
        if leaves.is_empty() {
            info!(%project, "all target chains are up to date");
            return Ok(ProposeOutcome::UpToDate);
        }

        let auth_bundle = make_auth_bundle(leaves);
        let signature = if options.dry_run {
            None
        } else {
            Some(sign_auth_root(&secrets.signer, auth_bundle.root)?)
        };
        let request_leaves: Vec<ProposalRequestLeaf> = auth_bundle
            .leaves
            .iter()
            .map(|bundled| scope.context.request_leaf(bundled, caller, signature.as_ref()))
            .collect();
        let chain_status = auth_bundle
            .leaf_counts()
            .into_iter()
            .map(|(chain_id, num_leaves)| ChainStatus {
                chain_id,
                num_leaves,
            })
            .collect();

        let canonical = previous.successor(config, &chain_ids);
        let canonical_json = canonical
            .to_json()
            .map_err(|err| ProposeError::Commit(format!("{err:#}")))?;

        let mut project_deployments = Vec::new();
        let mut gas_estimates = Vec::new();
        let mut plans = Vec::new();
        for chain in chains {
            project_deployments.extend(chain.deployment);
            gas_estimates.push(chain.gas);
            if !chain.plan.bundle.is_empty() {
                plans.push(chain.plan);
            }
        }

        let request = ProposalRequest {
            api_key: secrets.api_key.clone(),
            org_id: config.options.org_id.clone(),
            is_testnet: options.is_testnet,
            chain_ids,
            deployment_name: config.project.clone(),
            owners: canonical.options.owners.clone(),
            threshold: canonical.options.threshold,
            auth_address: auth,
            deployer_address: manager,
            canonical_config: canonical_json,
            project_deployments,
            gas_estimates,
            tree: ProposalTree {
                root: auth_bundle.root,
                chain_status,
                leaves: request_leaves,
            },
        };

        if !options.dry_run {
            self.relay.relay_proposal(&request).await?;
            self.relay
                .relay_configs(
                    &secrets.api_key,
                    &config.options.org_id,
                    std::slice::from_ref(&committed),
                )
                .await?;
            info!(root = %request.tree.root, "proposal submitted");
        }

        Ok(ProposeOutcome::Proposed(Box::new(ProposalReport {
            request,
            canonical,
            committed,
            config_uri: config_uri.clone(),
            plans,
            dry_run: options.dry_run,
        })))
    }

    async fn prepare_chain(
        &self,
        scope: &ProposalScope<'_>,
        network_name: &str,
        network: &NetworkConfig,
    ) -> Result<ChainProposal, ProposeError> {
        let chain_id = network.chain_id;
        let client = self
            .connector
            .connect(chain_id)
            .map_err(ProposeError::chain(chain_id))?;

        let cache = collect_chain_cache(
            client.as_ref(),
            CacheRequest {
                network_name,
                local: network.local,
                auth: scope.auth,
                manager: scope.manager,
                contracts: &scope.config.contracts,
            },
        )
        .await
        .map_err(ProposeError::chain(chain_id))?;
        if cache.chain_id != chain_id {
            return Err(ProposeError::Chain {
                chain_id,
                source: ChainError::ChainIdMismatch {
                    expected: chain_id,
                    actual: cache.chain_id,
                },
            });
        }

        let bundle = make_action_bundle(plan_actions(&scope.config.contracts, &cache));
        let plan = ChainPlan {
            chain_id,
            network: network_name.to_string(),
            auth: scope.auth,
            manager: scope.manager,
            config_uri: scope.config_uri.clone(),
            bundle,
        };
        let approval = (!plan.bundle.is_empty()).then(|| plan.approval());

        let leaves = derive_auth_leaves(&LeafDerivation {
            chain_id,
            auth_nonce: cache.auth_nonce,
            auth: scope.auth,
            manager: scope.manager,
            has_history: scope.context.has_history(chain_id),
            previous: &scope.context.previous().options,
            new: &scope.config.options,
            deployment: approval.as_ref(),
        });
        // Only a chain that receives leaves needs the caller's authority.
        if !leaves.is_empty() {
            scope.context.check_proposer(chain_id, scope.caller)?;
        }

        let deployment = approval.as_ref().map(|_| ProjectDeployment {
            chain_id,
            deployment_id: plan.deployment_id(),
            name: scope.config.project.clone(),
        });
        let gas = GasEstimate {
            chain_id,
            estimated_gas: estimate_chain_gas(&leaves, &plan.bundle),
        };

        debug!(
            chain_id,
            network = %network_name,
            actions = plan.bundle.len(),
            leaves = leaves.len(),
            auth_nonce = cache.auth_nonce,
            "chain prepared"
        );

        Ok(ChainProposal {
            plan,
            leaves,
            deployment,
            gas,
        })
    }
}
