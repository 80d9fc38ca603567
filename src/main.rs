//! MCPSYNC CLI entry point
//!
//! This is the main executable for the MCP server configuration sync tool.
//! It handles command-line argument parsing, error display, and command execution.
//!
//! The CLI supports commands for managing MCP server definitions across clients:
//! - `list` - List servers and their per-client state
//! - `add` - Add a server definition to one or more clients
//! - `remove` - Remove a server definition
//! - `enable` / `disable` - Toggle a server for a specific client
//! - `sync` - Reconcile divergent copies across client files
//! - `discover` - Scan for project-scoped server definitions
//! - `consolidate` - Promote project-scoped servers into the global store

use anyhow::Result;
use clap::Parser;
use mcpsync_cli::cli;
use mcpsync_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // Execute the command
    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
