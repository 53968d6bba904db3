//! Tessera - multi-chain contract deployments
//!
//! Usage:
//!   tessera propose [--testnet]     # Commit and submit a proposal
//!   tessera deploy --network NAME   # Execute the approved proposal on one network
//!   tessera cancel --network NAME   # Cancel the manager's active deployment
//!   tessera export-proxy -n NAME REF
//!   tessera import-proxy -n NAME ADDR
//!   tessera inspect [--role owner]  # Show derived addresses and pending plans

mod interactive;

use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tessera_core::commands::{
    CancelCommand, CancelOptions, DeployCommand, DeployOptions, DeployReport, DeployStatus,
    InspectCommand, InspectReport, ProposeCommand, ProposeCommandOptions, ProxyCommand,
};
use tessera_core::config::paths::default_state_dir;
use tessera_core::config::secrets::relay_url_from_env;
use tessera_core::config::{DeployerSecrets, ProposerSecrets};
use tessera_core::context::AppContext;
use tessera_core::deploy::{CancelOutcome, DriveOutcome};
use tessera_core::propose::ProposeOutcome;

use crate::interactive::ConfirmFlow;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Multi-chain contract deployments", long_about = None)]
struct Cli {
    /// Project directory containing tessera.toml (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// State directory for deployment records (default: platform state dir)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, sign and relay a proposal for every listed network
    Propose {
        /// Target the testnets list instead of mainnets
        #[arg(long)]
        testnet: bool,

        /// Validate and build the proposal without signing or relaying it
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Execute the proposed deployment on one network
    Deploy {
        /// Network name from [networks]
        #[arg(long, short)]
        network: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Cancel the active deployment on one network
    Cancel {
        /// Network name from [networks]
        #[arg(long, short)]
        network: String,
    },

    /// Take back administration of a proxy from the manager
    ExportProxy {
        /// Network name from [networks]
        #[arg(long, short)]
        network: String,

        /// Reference name of the proxied contract
        reference_name: String,
    },

    /// Hand an existing EIP-1967 proxy to the project's manager
    ImportProxy {
        /// Network name from [networks]
        #[arg(long, short)]
        network: String,

        /// Proxy address
        proxy: Address,
    },

    /// Show what the project file resolves to
    Inspect {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,

        /// Only list the signers of one role (owner or proposer)
        #[arg(long)]
        role: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=info,tessera_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let ctx = build_context(cli.project_dir, cli.state_dir)?;

    match cli.command {
        Commands::Propose {
            testnet,
            dry_run,
            yes,
            format,
        } => run_propose(ctx, testnet, dry_run, yes, format).await,
        Commands::Deploy { network, format } => run_deploy(ctx, network, format).await,
        Commands::Cancel { network } => run_cancel(ctx, network).await,
        Commands::ExportProxy {
            network,
            reference_name,
        } => run_export_proxy(ctx, network, reference_name).await,
        Commands::ImportProxy { network, proxy } => run_import_proxy(ctx, network, proxy).await,
        Commands::Inspect { format, role } => match role {
            Some(role) => run_inspect_role(ctx, format, &role),
            None => run_inspect(ctx, format),
        },
    }
}

fn build_context(project_dir: Option<PathBuf>, state_dir: Option<PathBuf>) -> Result<AppContext> {
    let project_root = match project_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let state_dir = match state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    tracing::debug!(
        project_root = %project_root.display(),
        state_dir = %state_dir.display(),
        "resolved context"
    );
    Ok(AppContext::new(project_root, state_dir).with_relay_url(relay_url_from_env()?))
}

async fn run_propose(
    ctx: AppContext,
    is_testnet: bool,
    dry_run: bool,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let secrets = ProposerSecrets::from_env()?;
    let cmd = ProposeCommand::new(ctx);

    let preview_options = ProposeCommandOptions {
        is_testnet,
        dry_run: true,
    };
    let report = match cmd.run(preview_options, &secrets).await? {
        ProposeOutcome::UpToDate => {
            println!("• Every target network is up to date; nothing to propose");
            return Ok(());
        }
        ProposeOutcome::Proposed(report) => report,
    };

    if dry_run {
        match format {
            OutputFormat::Table => {
                ConfirmFlow::new(true).preview(&report)?;
                println!("• Dry run: proposal was not signed or relayed");
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report.request.redacted())?
                );
            }
        }
        return Ok(());
    }

    let mut flow = ConfirmFlow::new(yes);
    if matches!(format, OutputFormat::Table) {
        flow.preview(&report)?;
    }
    if !flow.confirm("Sign and submit this proposal?")? {
        println!("Aborted");
        return Ok(());
    }

    let options = ProposeCommandOptions {
        is_testnet,
        dry_run: false,
    };
    match cmd.run(options, &secrets).await? {
        ProposeOutcome::UpToDate => {
            println!("• Every target network is up to date; nothing to propose");
        }
        ProposeOutcome::Proposed(report) => match format {
            OutputFormat::Table => {
                println!(
                    "{} Proposed '{}' with root {}",
                    style("✓").green(),
                    report.request.deployment_name,
                    report.request.tree.root
                );
                for plan in &report.plans {
                    println!(
                        "  {} ({}): deployment {} with {} actions",
                        plan.network,
                        plan.chain_id,
                        plan.deployment_id(),
                        plan.bundle.len()
                    );
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report.request.redacted())?
                );
            }
        },
    }
    Ok(())
}

async fn run_deploy(ctx: AppContext, network: String, format: OutputFormat) -> Result<()> {
    let secrets = DeployerSecrets::from_env()?;
    let report = DeployCommand::new(ctx)
        .run(&DeployOptions::new(network), &secrets)
        .await?;

    match format {
        OutputFormat::Table => print_deploy_table(&report),
        OutputFormat::Json => print_deploy_json(&report)?,
    }
    Ok(())
}

fn print_deploy_table(report: &DeployReport) {
    match &report.status {
        DeployStatus::Executed {
            plan,
            outcome,
            snapshot,
        } => {
            match outcome {
                DriveOutcome::AlreadyCompleted => println!(
                    "• Deployment {} on '{}' was already completed",
                    plan.deployment_id(),
                    report.network
                ),
                DriveOutcome::Completed {
                    approved,
                    execution,
                } => {
                    println!(
                        "{} Deployed {} on '{}' (chain {})",
                        style("✓").green(),
                        plan.deployment_id(),
                        report.network,
                        report.chain_id
                    );
                    if *approved {
                        println!("  Approved in this run");
                    }
                    println!(
                        "  {} actions in {} transactions ({} already executed)",
                        execution.executed,
                        execution.receipts.len(),
                        execution.skipped
                    );
                }
            }
            if let Some(snapshot) = snapshot {
                println!("  Snapshot: {}", snapshot);
            }
        }
        DeployStatus::NothingPending { last } => match last {
            Some(record) => println!(
                "• Nothing pending on '{}'; last deployment {} at {}",
                report.network,
                record.deployment_id,
                record.recorded_at.to_rfc3339()
            ),
            None => println!(
                "• Nothing pending on '{}'; run `tessera propose` first",
                report.network
            ),
        },
    }
}

fn print_deploy_json(report: &DeployReport) -> Result<()> {
    let output = match &report.status {
        DeployStatus::Executed {
            plan,
            outcome,
            snapshot,
        } => {
            let (completed_now, executed, transactions) = match outcome {
                DriveOutcome::AlreadyCompleted => (false, 0, 0),
                DriveOutcome::Completed { execution, .. } => {
                    (true, execution.executed, execution.receipts.len())
                }
            };
            serde_json::json!({
                "network": report.network,
                "chainId": report.chain_id,
                "deploymentId": plan.deployment_id().to_string(),
                "completedNow": completed_now,
                "actionsExecuted": executed,
                "transactions": transactions,
                "snapshot": snapshot,
            })
        }
        DeployStatus::NothingPending { last } => serde_json::json!({
            "network": report.network,
            "chainId": report.chain_id,
            "pending": false,
            "lastDeploymentId": last.as_ref().map(|record| record.deployment_id.to_string()),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_cancel(ctx: AppContext, network: String) -> Result<()> {
    let secrets = DeployerSecrets::from_env()?;
    let report = CancelCommand::new(ctx)
        .run(&CancelOptions { network }, &secrets)
        .await?;

    match report.outcome {
        CancelOutcome::Cancelled {
            deployment_id,
            receipt,
        } => println!(
            "{} Cancelled deployment {} on '{}' (tx {})",
            style("✓").green(),
            deployment_id,
            report.network,
            receipt.tx_hash
        ),
        CancelOutcome::NothingToCancel => println!(
            "• Manager {} on '{}' has no active deployment",
            report.manager, report.network
        ),
    }
    Ok(())
}

async fn run_export_proxy(ctx: AppContext, network: String, reference_name: String) -> Result<()> {
    let secrets = DeployerSecrets::from_env()?;
    let report = ProxyCommand::new(ctx)
        .export(&network, &reference_name, &secrets)
        .await?;
    println!(
        "{} Proxy {} on '{}' is now administered by {} (tx {})",
        style("✓").green(),
        report.transfer.proxy,
        report.network,
        report.transfer.new_admin,
        report.transfer.receipt.tx_hash
    );
    Ok(())
}

async fn run_import_proxy(ctx: AppContext, network: String, proxy: Address) -> Result<()> {
    let secrets = DeployerSecrets::from_env()?;
    let report = ProxyCommand::new(ctx)
        .import(&network, proxy, &secrets)
        .await?;
    println!(
        "{} Proxy {} on '{}' is now administered by manager {} (tx {})",
        style("✓").green(),
        report.transfer.proxy,
        report.network,
        report.manager,
        report.transfer.receipt.tx_hash
    );
    Ok(())
}

fn run_inspect(ctx: AppContext, format: OutputFormat) -> Result<()> {
    let report = InspectCommand::new(ctx).run()?;
    match format {
        OutputFormat::Table => print_inspect_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn run_inspect_role(ctx: AppContext, format: OutputFormat, role: &str) -> Result<()> {
    let signers = InspectCommand::new(ctx).role_signers(role)?;
    match format {
        OutputFormat::Table => {
            println!(
                "{}",
                style(format!("{} ({} required)", signers.role, signers.threshold)).bold()
            );
            for signer in &signers.signers {
                println!("  {}", signer);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&signers)?),
    }
    Ok(())
}

fn print_inspect_table(report: &InspectReport) {
    println!("{}", style(format!("Project: {}", report.project)).bold());
    println!("  Org:       {}", report.org_id);
    println!("  Threshold: {} of {}", report.threshold, report.owners.len());
    println!("  Auth:      {}", report.auth_address);
    println!("  Manager:   {}", report.manager_address);
    let committed = if report.config_committed {
        style("committed").green()
    } else {
        style("not committed locally").dim()
    };
    println!("  Config:    {} ({})", report.config_uri, committed);

    println!();
    println!("{}", style("Contracts").bold());
    if report.contracts.is_empty() {
        println!("  (none)");
    }
    for contract in &report.contracts {
        println!(
            "  {:<24} {:<10} {}",
            contract.name, contract.kind, contract.address
        );
    }

    println!();
    println!("{}", style("Networks").bold());
    for network in &report.networks {
        let pending = match network.pending_deployment {
            Some(id) => format!("pending {} ({} actions)", id, network.pending_actions),
            None => "nothing pending".to_string(),
        };
        let local = if network.local { " [local]" } else { "" };
        println!(
            "  {:<16} {:>10}{}  {}",
            network.name, network.chain_id, local, pending
        );
        if let Some(last) = network.last_deployment {
            println!("  {:<16} last deployment {}", "", last);
        }
    }
}
