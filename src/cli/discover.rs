//! Discover command implementation.
//!
//! Walks the given directories looking for project-scoped `.mcp.json`
//! files and lists every server definition found. Results come from the
//! discovery cache when a recent scan of the same roots exists; `--refresh`
//! forces a new walk. The scan itself runs off the async executor with a
//! spinner reporting progress.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::discovery::{ProgressFn, ProjectServerRecord, ScanProgress};
use crate::utils::progress::ProgressBar;

/// Command to scan for project-scoped server definitions.
///
/// # Examples
///
/// ```bash
/// # Scan the current directory tree
/// mcpsync discover
///
/// # Scan specific workspaces, bypassing the cache
/// mcpsync discover ~/work ~/oss --refresh
/// ```
#[derive(Debug, Parser)]
pub struct DiscoverCommand {
    /// Directories to scan (default: current directory)
    #[arg(value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Walk the filesystem even if a fresh cached result exists
    #[arg(long)]
    refresh: bool,

    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl DiscoverCommand {
    /// Execute the discover command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let manager = super::build_manager(store_path)?;
        let roots =
            if self.roots.is_empty() { vec![PathBuf::from(".")] } else { self.roots.clone() };

        let spinner = ProgressBar::new_spinner();
        spinner.set_prefix("discover");
        spinner.set_message("scanning...");
        let progress = {
            let spinner = spinner.clone();
            Arc::new(move |p: ScanProgress| {
                spinner.set_message(format!(
                    "{} directories, {} definition files · {}",
                    p.scanned_dirs,
                    p.found_files,
                    p.current.display()
                ));
            }) as ProgressFn
        };
        let records = manager.discover_with_progress(&roots, self.refresh, Some(progress)).await?;
        spinner.finish_and_clear();

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&json_rows(&records))?);
            }
            OutputFormat::Text => print_text(&records, roots.len()),
        }
        Ok(())
    }
}

fn print_text(records: &[ProjectServerRecord], root_count: usize) {
    if records.is_empty() {
        println!(
            "No project-scoped servers found under {root_count} root{}.",
            if root_count == 1 { "" } else { "s" }
        );
        return;
    }

    println!("{}", format!("Discovered {} project server(s):", records.len()).bold());
    for record in records {
        println!(
            "  {} {}  {}  {}",
            "•".cyan(),
            record.name.bold(),
            format!("[{}]", record.config.transport.label()).dimmed(),
            record.config.transport.summary()
        );
        println!("      {}", record.project_path.display());
        if record.is_duplicate {
            println!(
                "      {} name collides with a global server or another project",
                "⚠".yellow()
            );
        }
    }
    println!();
    println!("Promote these into the global store with 'mcpsync consolidate <DIR>'");
}

/// Serializable view of the discovered records for `--format json`.
fn json_rows(records: &[ProjectServerRecord]) -> Vec<serde_json::Value> {
    records
        .iter()
        .map(|record| {
            serde_json::json!({
                "name": record.name,
                "project_path": record.project_path,
                "transport": record.config.transport.label(),
                "config": record.config.to_raw(),
                "is_duplicate": record.is_duplicate,
                "discovered_at": record.discovered_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ServerRecord, TransportKind};
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_positional_roots() {
        let cmd = DiscoverCommand::parse_from(["discover", "/a", "/b", "--refresh"]);
        assert_eq!(cmd.roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(cmd.refresh);
    }

    #[test]
    fn test_parse_defaults() {
        let cmd = DiscoverCommand::parse_from(["discover"]);
        assert!(cmd.roots.is_empty());
        assert!(!cmd.refresh);
        assert_eq!(cmd.format, OutputFormat::Text);
    }

    #[test]
    fn test_json_rows_shape() {
        let record = ProjectServerRecord {
            name: "sqlite".to_string(),
            project_path: PathBuf::from("/work/app"),
            config: ServerRecord::new(
                "sqlite",
                TransportKind::Stdio {
                    command: "uvx".to_string(),
                    args: vec!["mcp-server-sqlite".to_string()],
                    env: BTreeMap::new(),
                },
            )
            .unwrap(),
            is_duplicate: true,
            discovered_at: Utc::now(),
        };

        let rows = json_rows(&[record]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "sqlite");
        assert_eq!(rows[0]["transport"], "stdio");
        assert_eq!(rows[0]["is_duplicate"], true);
        assert_eq!(rows[0]["config"]["command"], "uvx");
    }
}
