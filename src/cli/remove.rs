//! Remove command implementation.
//!
//! Removes a server from one client's configuration file, or from every
//! client and the enablement store. The single-client form keeps the
//! stored definition so other clients (and a later re-enable) still have
//! it; the everywhere form drops it completely.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::server::ClientKind;

/// Command to remove an MCP server.
///
/// # Examples
///
/// ```bash
/// # Remove from every client and forget the definition
/// mcpsync remove context7
///
/// # Remove from Gemini only; the definition stays in the store
/// mcpsync remove context7 --client gemini
/// ```
#[derive(Debug, Parser)]
pub struct RemoveCommand {
    /// Server name
    name: String,

    /// Remove from this client only, keeping the stored definition
    #[arg(long, value_name = "CLIENT")]
    client: Option<String>,
}

impl RemoveCommand {
    /// Execute the remove command against the given store.
    pub async fn execute_with_store_path(self, store_path: Option<PathBuf>) -> Result<()> {
        let mut manager = super::build_manager(store_path)?;

        let client = match &self.client {
            Some(name) => Some(manager.registry().parse_kind(name)?),
            None => None,
        };
        let outcome = manager.delete(&self.name, client.as_ref())?;

        if outcome.removed_from.is_empty() {
            println!("{} '{}' was not present in any client file", "•".cyan(), self.name);
        } else {
            let clients =
                outcome.removed_from.iter().map(ClientKind::as_str).collect::<Vec<_>>().join(", ");
            println!("{} removed '{}' from {clients}", "✓".green(), self.name);
        }
        if outcome.dropped_from_store {
            println!("  store entry dropped");
        } else if client.is_some() {
            println!("  definition kept in the store; re-enable with 'mcpsync enable'");
        }
        Ok(())
    }
}
