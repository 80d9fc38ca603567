//! Command-line interface for mcpsync.
//!
//! This module contains all CLI command implementations for synchronizing
//! MCP server definitions across AI assistant clients. Each command is a
//! thin wrapper over [`crate::manager::Manager`]: argument parsing and
//! output formatting live here, all semantics live behind the facade.
//!
//! # Command Architecture
//!
//! Each command is implemented as a separate module with its own argument
//! structure and execution logic. This modular design allows for:
//! - Clear separation of concerns
//! - Independent testing of each command
//! - Easy addition of new commands
//! - Consistent documentation and error handling
//!
//! # Available Commands
//!
//! ## Server Management
//! - `add` - Register a server and write it into client files
//! - `remove` - Remove a server from one client or everywhere
//! - `enable` / `disable` - Toggle a server per client
//!
//! ## Synchronization
//! - `sync` - Reconcile all client files to an agreed server set
//! - `discover` - Scan directories for project-scoped definitions
//! - `consolidate` - Promote discovered project servers into the store
//!
//! ## Inspection
//! - `list` - Show every known server and its per-client state
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--no-progress` - Disable progress bars and spinners
//! - `--store-path` - Path to a non-default enablement store file
//!
//! # Example
//!
//! ```bash
//! # Add a stdio server for every client
//! mcpsync add context7 --command npx --arg -y --arg @upstash/context7-mcp
//!
//! # Reconcile client files, most recent copy winning
//! mcpsync sync --strategy merge
//!
//! # Pull project-level servers into the global store
//! mcpsync discover ~/work
//! mcpsync consolidate ~/work --strategy rename
//! ```

mod add;
mod consolidate;
mod discover;
mod list;
mod remove;
mod sync;
mod toggle;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::ENV_NO_PROGRESS;
use crate::manager::Manager;

/// Runtime configuration for CLI execution.
///
/// This struct holds configuration that would otherwise be set as
/// environment variables, enabling dependency injection and better
/// testability. It allows tests and programmatic usage to control CLI
/// behavior without modifying global environment state.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level for the tracing subscriber.
    ///
    /// Common values are `"info"` and `"debug"`. An explicit `RUST_LOG`
    /// in the environment takes precedence. When `None`, no subscriber is
    /// installed and nothing is logged.
    pub log_level: Option<String>,

    /// Whether to disable progress indicators and animated output.
    ///
    /// When `true`, sets the `MCPSYNC_NO_PROGRESS` environment variable,
    /// which [`crate::utils::progress`] consults before drawing anything.
    /// Useful for automated scripts, CI pipelines, and terminals without
    /// ANSI support.
    pub no_progress: bool,
}

impl CliConfig {
    /// Create a new CLI configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this configuration to the process environment.
    ///
    /// Should be called exactly once at the start of CLI execution, before
    /// any other threads exist.
    pub fn apply_to_env(&self) {
        if self.no_progress {
            // Single-threaded at this point; nothing else reads the
            // environment concurrently.
            unsafe {
                std::env::set_var(ENV_NO_PROGRESS, "1");
            }
        }
    }
}

/// Installs the global tracing subscriber for this process.
///
/// `RUST_LOG` wins when set; otherwise the level derived from the CLI
/// flags applies to the whole crate. Output goes to stderr so `--format
/// json` listings on stdout stay machine-readable. A `None` level (quiet
/// mode) installs nothing.
fn init_logging(level: Option<&str>) {
    let Some(level) = level else { return };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

/// Builds the [`Manager`] every command runs against.
///
/// An explicit `--store-path` overrides the platform config directory;
/// everything else about the manager is standard.
fn build_manager(store_path: Option<PathBuf>) -> Result<Manager> {
    match store_path {
        Some(path) => Manager::with_store_path(path),
        None => Manager::new(),
    }
}

/// Main CLI structure for mcpsync.
///
/// This struct represents the root command and all its global options. It
/// uses the `clap` derive API to generate command-line parsing, help text,
/// and validation. Options marked `global = true` are available to all
/// subcommands.
///
/// # Examples
///
/// ```bash
/// mcpsync --verbose sync
/// mcpsync --quiet --no-progress discover ~/work
/// mcpsync --store-path ./servers.json list
/// ```
#[derive(Parser)]
#[command(
    name = "mcpsync",
    about = "Keep MCP server definitions consistent across AI assistant clients",
    version,
    author,
    long_about = "mcpsync synchronizes Model Context Protocol server definitions across \
                  AI assistant clients (Claude, Gemini, Codex), preserving disabled \
                  servers in a global store and consolidating project-level definitions."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging and detailed information.
    ///
    /// Shows per-decision debug messages: which client copies were
    /// compared, why a file write was skipped, cache hits and misses.
    /// Equivalent to setting `RUST_LOG=debug`.
    ///
    /// # Examples
    ///
    /// ```bash
    /// mcpsync --verbose sync     # Verbose reconciliation
    /// mcpsync -v discover        # Short form
    /// ```
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors for automation.
    ///
    /// Disables logging entirely; command results still print. JSON
    /// output (where supported) is unchanged. Ideal for scripts and
    /// CI pipelines.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a non-default enablement store file.
    ///
    /// Overrides the platform config directory location
    /// (`~/.config/mcpsync/servers.json` on Linux). Useful for testing
    /// with isolated stores and for shared setups.
    ///
    /// # Examples
    ///
    /// ```bash
    /// mcpsync --store-path ./servers.json list
    /// ```
    #[arg(long, global = true, value_name = "FILE")]
    store_path: Option<PathBuf>,

    /// Disable progress bars and spinners for automation.
    ///
    /// Uses plain text status messages instead of animated indicators.
    /// Equivalent to setting the `MCPSYNC_NO_PROGRESS` environment
    /// variable.
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands for the mcpsync CLI.
///
/// Each variant contains the specific command structure with its own
/// arguments and options; execution happens through the command's
/// `execute_with_store_path` method.
#[derive(Subcommand)]
enum Commands {
    /// List every known server and its per-client state.
    ///
    /// Shows the union of store entries and client-file servers, with a
    /// per-client presence and enablement marker, and annotates which
    /// client CLIs are actually installed. `--projects` appends servers
    /// found in project `.mcp.json` files.
    ///
    /// See [`list::ListCommand`] for detailed options and behavior.
    List(list::ListCommand),

    /// Register a server and write it into the chosen client files.
    ///
    /// Builds a stdio definition from `--command`/`--arg`/`--env` or an
    /// HTTP definition from `--url`/`--header`, stores it, and writes it
    /// into every target client's configuration file.
    ///
    /// See [`add::AddCommand`] for detailed options and behavior.
    Add(add::AddCommand),

    /// Remove a server from one client or from everywhere.
    ///
    /// With `--client`, removes the server from that client's file while
    /// keeping its definition in the store. Without, removes it from
    /// every client file and drops the store entry.
    ///
    /// See [`remove::RemoveCommand`] for detailed options and behavior.
    Remove(remove::RemoveCommand),

    /// Enable a server for one client.
    ///
    /// Writes the stored definition back into the client's file if it is
    /// absent and clears the disabled flag.
    ///
    /// See [`toggle::EnableCommand`] for detailed options and behavior.
    Enable(toggle::EnableCommand),

    /// Disable a server for one client.
    ///
    /// Captures the server's definition into the store, then removes it
    /// from the client's file. Other clients are unaffected.
    ///
    /// See [`toggle::DisableCommand`] for detailed options and behavior.
    Disable(toggle::DisableCommand),

    /// Reconcile all client files to an agreed set of servers.
    ///
    /// Loads every client's configuration, resolves divergent copies per
    /// the chosen strategy, filters by enablement, and rewrites only the
    /// files that need to change.
    ///
    /// See [`sync::SyncCommand`] for detailed options and behavior.
    Sync(sync::SyncCommand),

    /// Scan directories for project-scoped server definitions.
    ///
    /// Walks the given roots looking for `.mcp.json` files and lists
    /// each definition found, flagging names that collide with global
    /// servers or with other projects.
    ///
    /// See [`discover::DiscoverCommand`] for detailed options and behavior.
    Discover(discover::DiscoverCommand),

    /// Promote discovered project servers into the global store.
    ///
    /// Scans like `discover`, plans an action per project server
    /// (promote, replace, rename, or skip), and applies the plan in one
    /// atomic store write. `--dry-run` prints the plan without touching
    /// anything.
    ///
    /// See [`consolidate::ConsolidateCommand`] for detailed options and
    /// behavior.
    Consolidate(consolidate::ConsolidateCommand),
}

impl Cli {
    /// Execute the CLI with default configuration.
    ///
    /// This is the main entry point for CLI execution. It builds a
    /// configuration from the parsed command-line arguments and delegates
    /// to [`execute_with_config`](Self::execute_with_config).
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed CLI arguments.
    ///
    /// - **Verbose mode**: log level "debug" for detailed output
    /// - **Quiet mode**: no logging at all
    /// - **Default mode**: log level "info"
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None // No logging when quiet
        } else {
            Some("info".to_string())
        };

        CliConfig { log_level, no_progress: self.no_progress }
    }

    /// Execute the CLI with a specific configuration for dependency
    /// injection.
    ///
    /// This method enables testing and programmatic usage by accepting an
    /// external configuration instead of building one from CLI arguments.
    /// It is the core execution method all entry points eventually call.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        // Apply configuration to environment once at the start
        config.apply_to_env();
        init_logging(config.log_level.as_deref());

        match self.command {
            Commands::List(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Add(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Remove(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Enable(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Disable(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Sync(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Discover(cmd) => cmd.execute_with_store_path(self.store_path).await,
            Commands::Consolidate(cmd) => cmd.execute_with_store_path(self.store_path).await,
        }
    }
}

/// Output format options shared by the listing commands.
#[derive(Clone, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output with colors and status glyphs.
    Text,

    /// Structured JSON output for automation and CI integration.
    Json,
}
