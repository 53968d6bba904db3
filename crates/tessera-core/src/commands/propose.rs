//! Propose command implementation.
//!
//! Loads the project file, picks the relay (HTTP when a URL is configured, the local
//! state directory otherwise), runs the orchestrator and stores the resulting chain
//! plans so `deploy` executes exactly what was proposed.

use anyhow::Context;
use tracing::info;

use crate::chain::{ChainConnector, RpcConnector};
use crate::config::{ProjectConfig, ProposerSecrets};
use crate::context::AppContext;
use crate::propose::{ProposalOrchestrator, ProposeOptions, ProposeOutcome};
use crate::relay::{CanonicalConfigSource, HttpRelayClient, RelayClient};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProposeCommandOptions {
    pub is_testnet: bool,
    pub dry_run: bool,
}

impl From<ProposeCommandOptions> for ProposeOptions {
    fn from(options: ProposeCommandOptions) -> Self {
        ProposeOptions {
            is_testnet: options.is_testnet,
            dry_run: options.dry_run,
        }
    }
}

/// Collaborators a proposal talks to.
pub struct ProposeServices<'a> {
    pub connector: &'a dyn ChainConnector,
    pub canonical_source: &'a dyn CanonicalConfigSource,
    pub relay: &'a dyn RelayClient,
}

#[derive(Debug)]
pub struct ProposeCommand {
    ctx: AppContext,
}

impl ProposeCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Run against the networks and relay named in the project file.
    pub async fn run(
        &self,
        options: ProposeCommandOptions,
        secrets: &ProposerSecrets,
    ) -> anyhow::Result<ProposeOutcome> {
        let config = self.ctx.load_config()?;
        let connector = RpcConnector::new(config.endpoints());

        match self.ctx.relay_url(&config) {
            Some(url) => {
                info!(%url, "using relay");
                let relay = HttpRelayClient::new(url)?;
                let services = ProposeServices {
                    connector: &connector,
                    canonical_source: &relay,
                    relay: &relay,
                };
                self.run_with(&config, options, secrets, services).await
            }
            None => {
                let relay = self.ctx.local_relay();
                let services = ProposeServices {
                    connector: &connector,
                    canonical_source: &relay,
                    relay: &relay,
                };
                self.run_with(&config, options, secrets, services).await
            }
        }
    }

    pub async fn run_with(
        &self,
        config: &ProjectConfig,
        options: ProposeCommandOptions,
        secrets: &ProposerSecrets,
        services: ProposeServices<'_>,
    ) -> anyhow::Result<ProposeOutcome> {
        let orchestrator = ProposalOrchestrator::new(
            services.connector,
            services.canonical_source,
            services.relay,
        );
        let outcome = orchestrator
            .propose(config, secrets, options.into())
            .await
            .with_context(|| format!("Failed to propose '{}'", config.project))?;

        if let ProposeOutcome::Proposed(report) = &outcome
            && !report.dry_run
        {
            let records = self.ctx.deployment_records();
            records.save_plans(&report.plans).with_context(|| {
                format!("Failed to save deployment plans: {}", records.path().display())
            })?;
        }
        Ok(outcome)
    }
}
