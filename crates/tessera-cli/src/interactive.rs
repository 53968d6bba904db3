//! Proposal preview and confirmation.
//!
//! `tessera propose` builds a dry run first, shows what it would submit and asks before
//! signing. `--yes` skips the question.

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use tessera_core::propose::ProposalReport;

pub struct ConfirmFlow<W: Write = io::Stdout> {
    /// Skip all confirmations
    yes: bool,
    /// Output writer (for testing)
    writer: W,
    theme: ColorfulTheme,
}

impl ConfirmFlow<io::Stdout> {
    pub fn new(yes: bool) -> Self {
        Self {
            yes,
            writer: io::stdout(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> ConfirmFlow<W> {
    #[cfg(test)]
    pub fn with_writer(yes: bool, writer: W) -> Self {
        Self {
            yes,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    pub fn preview(&mut self, report: &ProposalReport) -> Result<()> {
        let request = &report.request;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{}",
            style(format!("  Proposal for {}", request.deployment_name))
                .bold()
                .cyan()
        )?;
        writeln!(self.writer, "  ───────────────────────────")?;
        let network_type = if request.is_testnet {
            "testnets"
        } else {
            "mainnets"
        };
        writeln!(self.writer, "  Network type: {}", style(network_type).green())?;
        writeln!(self.writer, "  Auth:         {}", style(request.auth_address).green())?;
        writeln!(
            self.writer,
            "  Manager:      {}",
            style(request.deployer_address).green()
        )?;
        writeln!(
            self.writer,
            "  Owners:       {} of {}",
            request.threshold,
            request.owners.len()
        )?;
        writeln!(self.writer, "  Auth root:    {}", request.tree.root)?;
        writeln!(self.writer, "  Config:       {}", report.config_uri)?;
        writeln!(self.writer)?;

        for status in &request.tree.chain_status {
            let plan = report
                .plans
                .iter()
                .find(|plan| plan.chain_id == status.chain_id);
            let gas = request
                .gas_estimates
                .iter()
                .find(|estimate| estimate.chain_id == status.chain_id)
                .map(|estimate| estimate.estimated_gas)
                .unwrap_or_default();
            match plan {
                Some(plan) => writeln!(
                    self.writer,
                    "  {} {} (chain {}): {} leaves, {} actions, ~{} gas",
                    style("•").cyan(),
                    plan.network,
                    status.chain_id,
                    status.num_leaves,
                    plan.bundle.len(),
                    gas
                )?,
                None => writeln!(
                    self.writer,
                    "  {} chain {}: {} leaves, no contract changes, ~{} gas",
                    style("•").cyan(),
                    status.chain_id,
                    status.num_leaves,
                    gas
                )?,
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        self.writer.flush()?;
        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        Ok(confirmed)
    }
}
