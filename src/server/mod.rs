//! Server definitions and the client registry.
//!
//! This module holds the canonical data model shared by every other part of
//! the crate: a [`ServerRecord`] describes one MCP server independently of
//! any client's on-disk syntax, and the [`ClientRegistry`] describes the
//! known AI-assistant clients whose configuration files are read and written.
//!
//! # Transport Variants
//!
//! Server definitions come in exactly two shapes:
//!
//! - **Stdio**: a local process launched via `command` with optional `args`
//!   and `env`
//! - **Http**: a remote endpoint reached via `url` with optional `headers`
//!
//! Wire documents do not always label the variant explicitly, so
//! [`ServerRecord::from_raw`] applies the classification rules: an explicit
//! `type` field wins, otherwise a `command` key means stdio and a `url` key
//! means http.
//!
//! # Examples
//!
//! ```rust
//! use mcpsync_cli::server::{RawServerEntry, ServerRecord, TransportKind};
//!
//! # fn example() -> anyhow::Result<()> {
//! let raw: RawServerEntry = serde_json::from_str(
//!     r#"{"command": "npx", "args": ["-y", "@upstash/context7-mcp"]}"#,
//! )?;
//! let record = ServerRecord::from_raw("context7", raw)?;
//! assert!(matches!(record.transport, TransportKind::Stdio { .. }));
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod registry;

pub use model::{RawServerEntry, ServerRecord, TransportKind, validate_server_name};
pub use registry::{ClientKind, ClientRegistry, ClientSpec, ConfigFormat};
