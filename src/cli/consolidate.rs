//! Consolidate command implementation.
//!
//! Scans the given directories like `discover`, plans one action per
//! project server (promote, replace, rename, or skip), and applies the
//! plan to the enablement store in a single atomic write. `--dry-run`
//! prints the plan and guarantees nothing on disk changes.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::consolidate::{ConsolidationReport, PlannedAction};
use crate::sync::SyncStrategy;

/// Command to promote project-scoped servers into the global store.
///
/// # Examples
///
/// ```bash
/// # See what would happen first
/// mcpsync consolidate ~/work --dry-run
///
/// # Apply, renaming collisions to '<name>-<project folder>'
/// mcpsync consolidate ~/work --strategy rename
///
/// # Apply, letting project copies overwrite global ones
/// mcpsync consolidate ~/work --strategy merge
/// ```
#[derive(Debug, Parser)]
pub struct ConsolidateCommand {
    /// Directories to scan (default: current directory)
    #[arg(value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Collision strategy: skip, merge, rename, or keep:<client>
    #[arg(long, default_value = "rename")]
    strategy: String,

    /// Plan only; leave the store and all files untouched
    #[arg(long)]
    dry_run: bool,

    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ConsolidateCommand {
    /// Execute the consolidate command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let mut manager = super::build_manager(store_path)?;
        let roots =
            if self.roots.is_empty() { vec![PathBuf::from(".")] } else { self.roots.clone() };
        let strategy: SyncStrategy = self.strategy.parse()?;

        let report = manager.consolidate(&roots, &strategy, self.dry_run).await?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report, self.dry_run),
        }
        Ok(())
    }
}

fn print_report(report: &ConsolidationReport, dry_run: bool) {
    if report.plan.entries.is_empty() {
        println!("No project-scoped servers found; nothing to consolidate.");
        return;
    }

    println!("{}", format!("Consolidation plan ({} entries):", report.plan.entries.len()).bold());
    for entry in &report.plan.entries {
        match &entry.action {
            PlannedAction::Promote => {
                println!("  {} promote '{}'", "✓".green(), entry.name);
            }
            PlannedAction::Replace => {
                println!("  {} replace global '{}'", "✓".green(), entry.name);
            }
            PlannedAction::Rename { to } => {
                println!("  {} rename '{}' → '{to}'", "⚠".yellow(), entry.name);
            }
            PlannedAction::Skip { reason } => {
                println!("  {} skip '{}': {reason}", "•".cyan(), entry.name);
            }
        }
        println!("      {}", entry.project_path.display());
    }

    let counts = report.plan.counts();
    println!(
        "{} promoted, {} replaced, {} renamed, {} skipped",
        counts.promoted, counts.replaced, counts.renamed, counts.skipped
    );

    if report.applied {
        match &report.backup {
            Some(backup) => {
                println!("{} store updated (backup at {})", "✓".green(), backup.display());
            }
            None => println!("{} store updated", "✓".green()),
        }
    } else if dry_run {
        println!("Dry run; no changes were made. Re-run without --dry-run to apply.");
    } else {
        println!("Nothing to apply; the store already matches.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_rename() {
        let cmd = ConsolidateCommand::parse_from(["consolidate"]);
        assert_eq!(cmd.strategy.parse::<SyncStrategy>().unwrap(), SyncStrategy::Rename);
        assert!(!cmd.dry_run);
    }

    #[test]
    fn test_parse_dry_run_with_roots() {
        let cmd = ConsolidateCommand::parse_from(["consolidate", "/work", "--dry-run"]);
        assert_eq!(cmd.roots, vec![PathBuf::from("/work")]);
        assert!(cmd.dry_run);
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        let cmd = ConsolidateCommand::parse_from(["consolidate", "--strategy", "zap"]);
        assert!(cmd.strategy.parse::<SyncStrategy>().is_err());
    }
}
