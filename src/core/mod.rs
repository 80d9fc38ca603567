//! Core types and functionality for MCPSYNC
//!
//! This module forms the foundation of MCPSYNC's type system, providing the
//! error handling contracts used throughout the codebase.
//!
//! # Error Management
//!
//! MCPSYNC uses an error handling system designed for both developer ergonomics
//! and end-user experience:
//! - **Strongly-typed errors** ([`McpSyncError`]) for precise error handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions for CLI users
//! - **Automatic error conversion** from common standard library errors
//! - **Contextual suggestions** tailored to specific error conditions
//!
//! # Propagation Policy
//!
//! Adapter and store errors are returned as typed results to the sync and
//! consolidation layers, which aggregate them per-client and per-record rather
//! than aborting a whole operation. A single client's serialization failure is
//! reported but does not block successful writes to other clients. Migration
//! failures are fatal for that load call but never corrupt the original file.
//!
//! # Example
//!
//! ```rust
//! use mcpsync_cli::core::{McpSyncError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn example_operation() -> Result<String> {
//!     Err(McpSyncError::ServerNotFound {
//!         name: "context7".to_string(),
//!         closest: None,
//!     }
//!     .into())
//! }
//!
//! fn handle_operation() {
//!     if let Err(e) = example_operation() {
//!         let friendly = user_friendly_error(e);
//!         friendly.display(); // Shows colored error with suggestions
//!     }
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, McpSyncError, closest_match, user_friendly_error};
