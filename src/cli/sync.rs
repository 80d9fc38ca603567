//! Sync command implementation.
//!
//! Reconciles every client's configuration file to an agreed server set:
//! names known to one client propagate to the others, divergent copies are
//! resolved per the chosen strategy, and the enablement store filters what
//! each client receives. Files already in agreement are left untouched.

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::sync::{SyncReport, SyncStrategy};

/// Command to reconcile all client configuration files.
///
/// # Examples
///
/// ```bash
/// # Most recently modified copy wins, env/headers keys are unioned
/// mcpsync sync
///
/// # Claude's copy wins every conflict
/// mcpsync sync --strategy keep:claude
///
/// # Report without resolving conflicts
/// mcpsync sync --strategy skip --format json
/// ```
#[derive(Debug, Parser)]
pub struct SyncCommand {
    /// Conflict strategy: skip, merge, rename, or keep:<client>
    #[arg(long, default_value = "merge")]
    strategy: String,

    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl SyncCommand {
    /// Execute the sync command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let manager = super::build_manager(store_path)?;
        let strategy: SyncStrategy = self.strategy.parse()?;
        let report = manager.sync(&strategy)?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report, &strategy),
        }

        if report.has_failures() {
            bail!("sync finished with {} failure(s)", report.failed.len());
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport, strategy: &SyncStrategy) {
    println!("Synchronizing clients (strategy: {strategy})");

    for change in &report.changed {
        println!("  {} {}: {} '{}'", "✓".green(), change.client, change.action, change.server);
    }
    for skip in &report.skipped {
        println!("  {} skipped '{}': {}", "⚠".yellow(), skip.server, skip.reason);
    }
    for failure in &report.failed {
        match &failure.server {
            Some(server) => println!(
                "  {} {} for '{server}': {}",
                "✗".red(),
                failure.client,
                failure.reason
            ),
            None => println!("  {} {}: {}", "✗".red(), failure.client, failure.reason),
        }
    }

    if report.is_unchanged() && report.skipped.is_empty() && !report.has_failures() {
        println!("{} all clients already in sync", "✓".green());
    } else {
        println!("{}", report.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ClientKind;

    #[test]
    fn test_default_strategy_is_merge() {
        let cmd = SyncCommand::parse_from(["sync"]);
        assert_eq!(cmd.strategy.parse::<SyncStrategy>().unwrap(), SyncStrategy::Merge);
    }

    #[test]
    fn test_keep_strategy_flag() {
        let cmd = SyncCommand::parse_from(["sync", "--strategy", "keep:claude"]);
        assert_eq!(
            cmd.strategy.parse::<SyncStrategy>().unwrap(),
            SyncStrategy::KeepClient(ClientKind::new("claude"))
        );
    }

    #[test]
    fn test_json_format_flag() {
        let cmd = SyncCommand::parse_from(["sync", "--format", "json"]);
        assert_eq!(cmd.format, OutputFormat::Json);
    }
}
