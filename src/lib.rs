//! MCPSYNC - MCP Server Configuration Sync
//!
//! A synchronization and consolidation engine for MCP (Model Context Protocol)
//! server definitions consumed by AI assistant clients (Claude Code, Gemini CLI,
//! Codex CLI). One server definition, written once, kept consistent across every
//! client's configuration file.
//!
//! # Architecture Overview
//!
//! MCPSYNC follows a neutral-model/adapter design where:
//! - A format-neutral [`server::ServerRecord`] models one server definition
//! - Format adapters translate losslessly between the model and each client's
//!   on-disk format (JSON documents and TOML tables)
//! - A persistent enablement store tracks per-client enabled/disabled state
//! - A sync engine reconciles divergent copies across clients via pluggable
//!   conflict strategies
//! - A discovery service finds project-scoped definitions, which a
//!   consolidation engine can promote into the global store
//!
//! ## Key Features
//!
//! - **Lossless translation**: definitions round-trip between JSON and TOML
//!   formats without dropping fields
//! - **Per-client enablement**: disable a server for one client without
//!   touching the others, without discarding its configuration
//! - **Schema migration**: legacy store files are upgraded transparently with
//!   a timestamped backup
//! - **Conflict resolution**: skip, keep-client, merge, and rename strategies
//!   for divergent copies and name collisions
//! - **Project discovery**: background scans for `.mcp.json` files with
//!   caching, request coalescing, and cooperative cancellation
//! - **Safety**: atomic writes, stale-write detection, full-store backups
//!   before destructive operations
//!
//! # Core Modules
//!
//! ## Engine
//! - [`server`] - Neutral server model, transport variants, and client registry
//! - [`adapters`] - JSON and TOML format adapters
//! - [`store`] - Enablement store with legacy migration and atomic persistence
//! - [`sync`] - Reconciliation engine and conflict strategies
//! - [`discovery`] - Project-scoped definition scanning with caching
//! - [`consolidate`] - Promotion of project servers into the global store
//!
//! ## Supporting Modules
//! - [`availability`] - TTL-cached detection of installed client CLIs
//! - [`cli`] - Command-line interface (thin glue over [`manager`])
//! - [`core`] - Error types and user-facing error reporting
//! - [`manager`] - Facade exposing engine operations as structured results
//! - [`utils`] - Atomic file operations, path resolution, progress display
//!
//! # Client Configuration Files
//!
//! ## JSON clients (Claude Code, Gemini CLI)
//! ```json
//! {
//!   "mcpServers": {
//!     "filesystem": {
//!       "type": "stdio",
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-filesystem"]
//!     },
//!     "context7": {
//!       "type": "http",
//!       "url": "https://mcp.context7.com/mcp"
//!     }
//!   }
//! }
//! ```
//!
//! ## TOML client (Codex CLI)
//! ```toml
//! [mcp_servers.filesystem]
//! command = "npx"
//! args = ["-y", "@modelcontextprotocol/server-filesystem"]
//!
//! [mcp_servers.context7]
//! url = "https://mcp.context7.com/mcp"
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # List servers across all clients
//! mcpsync list
//!
//! # Disable a server for one client only
//! mcpsync disable context7 --client codex
//!
//! # Reconcile divergent copies, most recent edit wins
//! mcpsync sync --strategy merge
//!
//! # Find project-scoped servers under your workspace
//! mcpsync discover ~/projects
//!
//! # Preview consolidation, then apply it
//! mcpsync consolidate --strategy rename --dry-run
//! mcpsync consolidate --strategy rename
//! ```

// Engine modules
pub mod adapters;
pub mod consolidate;
pub mod core;
pub mod discovery;
pub mod server;
pub mod store;
pub mod sync;

// Supporting modules
pub mod availability;
pub mod cli;
pub mod constants;
pub mod manager;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
