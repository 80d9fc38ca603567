//! List command implementation.
//!
//! Shows every known server with its per-client presence and enablement
//! state, annotated with which client CLIs are actually installed. With
//! `--projects` the listing also includes project-scoped definitions found
//! under the scan roots.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::availability::AvailabilityCache;
use crate::cli::OutputFormat;
use crate::manager::{ClientState, ServerOverview, ServerScope};
use crate::server::{ClientKind, ServerRecord};

/// Command to list all known MCP servers.
///
/// # Examples
///
/// ```bash
/// # Global servers and their per-client state
/// mcpsync list
///
/// # Include project-scoped servers under the home directory
/// mcpsync list --projects --root ~/work
///
/// # Machine-readable output
/// mcpsync list --format json
/// ```
#[derive(Debug, Parser)]
pub struct ListCommand {
    /// Include project-scoped servers found under the scan roots.
    #[arg(long)]
    projects: bool,

    /// Directory to scan for project definitions (repeatable, implies
    /// `--projects`). Defaults to the current directory.
    #[arg(long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Output format: text or json
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ListCommand {
    /// Execute the list command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let mut manager = super::build_manager(store_path)?;
        let include_projects = self.projects || !self.roots.is_empty();
        if !self.roots.is_empty() {
            manager.set_project_roots(self.roots.clone());
        }

        let overviews = manager.get_all(include_projects).await?;

        let mut availability = AvailabilityCache::new();
        let installed: BTreeMap<ClientKind, bool> = manager
            .registry()
            .specs()
            .iter()
            .map(|spec| (spec.kind.clone(), availability.is_available(spec)))
            .collect();

        match self.format {
            OutputFormat::Json => {
                let doc = serde_json::json!({
                    "clients": installed,
                    "servers": overviews,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            }
            OutputFormat::Text => print_text(&overviews, &installed),
        }
        Ok(())
    }
}

fn print_text(overviews: &[ServerOverview], installed: &BTreeMap<ClientKind, bool>) {
    println!("{}", "Clients:".bold());
    for (kind, available) in installed {
        if *available {
            println!("  {} {:<8} installed", "✓".green(), kind.as_str());
        } else {
            println!("  {} {:<8} not found in PATH", "✗".red(), kind.as_str());
        }
    }

    let global: Vec<&ServerOverview> =
        overviews.iter().filter(|row| row.scope == ServerScope::Global).collect();
    let project: Vec<&ServerOverview> =
        overviews.iter().filter(|row| row.scope != ServerScope::Global).collect();

    println!();
    if global.is_empty() {
        println!("No global servers configured.");
        println!("Add one with 'mcpsync add <name> --command <cmd>'");
    } else {
        println!("{}", "Global servers:".bold());
        for row in &global {
            let (label, summary) = describe(row);
            println!("  {} {}  {}  {summary}", "•".cyan(), row.name.bold(), label.dimmed());
            let states: Vec<String> = row
                .clients
                .iter()
                .map(|(kind, state)| format!("{kind} {}", state_glyph(*state)))
                .collect();
            println!("      {}", states.join("   "));
        }
    }

    if !project.is_empty() {
        println!();
        println!("{}", "Project servers:".bold());
        for row in &project {
            let (label, summary) = describe(row);
            println!("  {} {}  {}  {summary}", "•".cyan(), row.name.bold(), label.dimmed());
            if let ServerScope::Project { path } = &row.scope {
                println!("      {}", path.display());
            }
            if row.is_duplicate {
                println!("      {} name collides with another definition", "⚠".yellow());
            }
        }
    }
}

/// Transport label and one-line summary for a listing row.
fn describe(row: &ServerOverview) -> (String, String) {
    let Some(raw) = &row.config else {
        return ("[?]".to_string(), String::new());
    };
    match ServerRecord::from_raw(row.name.clone(), raw.clone()) {
        Ok(record) => {
            (format!("[{}]", record.transport.label()), record.transport.summary())
        }
        Err(_) => ("[?]".to_string(), "unreadable definition".to_string()),
    }
}

/// Per-client status marker: present and enabled are the only healthy
/// agreement states; a mismatch means the next sync will touch the file.
fn state_glyph(state: ClientState) -> String {
    match (state.enabled, state.present) {
        (true, true) => format!("{} enabled", "✓".green()),
        (false, false) => format!("{} disabled", "✗".red()),
        _ => format!("{} pending sync", "⚠".yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cmd = ListCommand::parse_from(["list"]);
        assert!(!cmd.projects);
        assert!(cmd.roots.is_empty());
        assert_eq!(cmd.format, OutputFormat::Text);
    }

    #[test]
    fn test_parse_projects_with_roots() {
        let cmd =
            ListCommand::parse_from(["list", "--projects", "--root", "/a", "--root", "/b"]);
        assert!(cmd.projects);
        assert_eq!(cmd.roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_parse_json_format() {
        let cmd = ListCommand::parse_from(["list", "--format", "json"]);
        assert_eq!(cmd.format, OutputFormat::Json);
    }

    #[test]
    fn test_state_glyph_words() {
        colored::control::set_override(false);
        let agree = state_glyph(ClientState { present: true, enabled: true });
        assert!(agree.contains("enabled"));
        let off = state_glyph(ClientState { present: false, enabled: false });
        assert!(off.contains("disabled"));
        let drift = state_glyph(ClientState { present: true, enabled: false });
        assert!(drift.contains("pending sync"));
        colored::control::unset_override();
    }

    #[test]
    fn test_describe_falls_back_on_missing_config() {
        let row = ServerOverview {
            name: "ghost".to_string(),
            scope: ServerScope::Global,
            config: None,
            clients: BTreeMap::new(),
            is_duplicate: false,
        };
        let (label, summary) = describe(&row);
        assert_eq!(label, "[?]");
        assert!(summary.is_empty());
    }
}
