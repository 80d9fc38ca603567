//! Enable and disable command implementations.
//!
//! The two commands share an argument surface (server name plus a target
//! client) and differ only in the state they set, so they live together.
//! Disabling captures the server's definition into the store before
//! removing it from the client's file; enabling writes it back. Other
//! clients are never touched.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::store::EnablementChange;

/// Command to enable a server for one client.
///
/// # Examples
///
/// ```bash
/// mcpsync enable context7 --client claude
/// ```
#[derive(Debug, Parser)]
pub struct EnableCommand {
    /// Server name
    name: String,

    /// Client to enable the server for
    #[arg(long, value_name = "CLIENT")]
    client: String,
}

impl EnableCommand {
    /// Execute the enable command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let change = set_state(store_path, &self.name, &self.client, true)?;
        println!("{} enabled '{}' for {}", "✓".green(), change.server, change.client);
        Ok(())
    }
}

/// Command to disable a server for one client.
///
/// The server's definition is preserved in the store even when it ends up
/// disabled for every client, so nothing is lost.
///
/// # Examples
///
/// ```bash
/// mcpsync disable context7 --client gemini
/// ```
#[derive(Debug, Parser)]
pub struct DisableCommand {
    /// Server name
    name: String,

    /// Client to disable the server for
    #[arg(long, value_name = "CLIENT")]
    client: String,
}

impl DisableCommand {
    /// Execute the disable command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let change = set_state(store_path, &self.name, &self.client, false)?;
        println!(
            "{} disabled '{}' for {} (definition kept in the store)",
            "✗".yellow(),
            change.server,
            change.client
        );
        Ok(())
    }
}

fn set_state(
    store_path: Option<PathBuf>,
    name: &str,
    client: &str,
    enabled: bool,
) -> Result<EnablementChange> {
    let mut manager = super::build_manager(store_path)?;
    let kind = manager.registry().parse_kind(client)?;
    manager.set_enabled(name, &kind, enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enable() {
        let cmd = EnableCommand::parse_from(["enable", "context7", "--client", "claude"]);
        assert_eq!(cmd.name, "context7");
        assert_eq!(cmd.client, "claude");
    }

    #[test]
    fn test_client_is_required() {
        assert!(EnableCommand::try_parse_from(["enable", "context7"]).is_err());
        assert!(DisableCommand::try_parse_from(["disable", "context7"]).is_err());
    }
}
