//! Error handling for MCPSYNC
//!
//! This module provides the error types and user-friendly error reporting for
//! the sync engine. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`McpSyncError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Formats**: [`McpSyncError::Format`], [`McpSyncError::UnsupportedVariant`]
//! - **Validation**: [`McpSyncError::Validation`], [`McpSyncError::ServerNotFound`],
//!   [`McpSyncError::UnknownClient`]
//! - **Persistence**: [`McpSyncError::StaleWrite`], [`McpSyncError::Migration`],
//!   [`McpSyncError::IoError`]
//!
//! # Error Conversion and Context
//!
//! Common standard library errors are automatically converted:
//! - [`std::io::Error`] → [`McpSyncError::IoError`]
//! - [`serde_json::Error`] → [`McpSyncError::JsonError`]
//! - [`toml::de::Error`] → [`McpSyncError::TomlError`]
//!
//! Use [`user_friendly_error`] to convert any error into a user-friendly format
//! with contextual suggestions.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mcpsync_cli::core::{McpSyncError, user_friendly_error};
//!
//! fn load_server() -> Result<(), McpSyncError> {
//!     Err(McpSyncError::ServerNotFound {
//!         name: "contxt7".to_string(),
//!         closest: Some("context7".to_string()),
//!     })
//! }
//!
//! match load_server() {
//!     Ok(()) => println!("Success!"),
//!     Err(e) => {
//!         let ctx = user_friendly_error(anyhow::Error::from(e));
//!         ctx.display(); // Shows colored error with "did you mean" suggestion
//!     }
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for MCPSYNC operations
///
/// This enum represents all failure modes of the sync engine. Each variant is
/// designed to provide specific context about the failure and enable
/// appropriate handling strategies: adapter and store errors carry enough
/// detail for the sync layer to aggregate them per-client and per-record
/// instead of aborting whole operations.
///
/// # Examples
///
/// ```rust,no_run
/// use mcpsync_cli::core::McpSyncError;
///
/// // A record that a target format cannot express
/// let error = McpSyncError::UnsupportedVariant {
///     name: "context7".to_string(),
///     variant: "http".to_string(),
///     format: "legacy-ini".to_string(),
/// };
///
/// // A record missing required fields for its declared variant
/// let error = McpSyncError::Validation {
///     name: "filesystem".to_string(),
///     reason: "stdio transport requires a command".to_string(),
/// };
/// ```
#[derive(Error, Debug)]
pub enum McpSyncError {
    /// Malformed input for a given format adapter
    ///
    /// Raised when a client configuration file or store file cannot be parsed
    /// at the syntax level. Per-entry problems inside a well-formed document
    /// are reported as [`Validation`](Self::Validation) instead.
    #[error("Malformed {format} input: {reason}")]
    Format {
        /// The format that failed to parse (e.g. "json", "toml")
        format: String,
        /// Parser diagnostic describing the failure
        reason: String,
    },

    /// A transport variant cannot be expressed in a target format
    ///
    /// Translation into a format that cannot represent a record's transport
    /// must fail loudly rather than silently drop fields.
    #[error("Server '{name}': transport '{variant}' cannot be expressed in {format} format")]
    UnsupportedVariant {
        /// Name of the affected server
        name: String,
        /// The transport variant ("stdio" or "http")
        variant: String,
        /// The target format that cannot express it
        format: String,
    },

    /// A record is missing required fields for its declared variant
    #[error("Invalid server definition '{name}': {reason}")]
    Validation {
        /// Name of the invalid server definition
        name: String,
        /// Reason why the definition is invalid
        reason: String,
    },

    /// On-disk file changed since it was last read
    ///
    /// Raised before overwriting a file whose fingerprint no longer matches
    /// the state captured at load time. The write is refused; the caller
    /// should reload and retry.
    #[error("File changed on disk since it was last read: {path}")]
    StaleWrite {
        /// Path of the file that was concurrently modified
        path: String,
    },

    /// Legacy store file could not be safely upgraded
    ///
    /// Fatal for the load call that detected it, but the original file is
    /// left untouched (migration operates on an in-memory copy).
    #[error("Failed to migrate legacy store {path}: {reason}")]
    Migration {
        /// Path of the legacy store file
        path: String,
        /// Reason the upgrade was refused
        reason: String,
    },

    /// Named server does not exist in any scope
    #[error("Server '{name}' not found")]
    ServerNotFound {
        /// The requested server name
        name: String,
        /// Closest known name, for "did you mean" suggestions
        closest: Option<String>,
    },

    /// Client identifier is not in the registry
    #[error("Unknown client '{name}'")]
    UnknownClient {
        /// The unrecognized client identifier
        name: String,
    },

    /// No usable rename could be derived for a colliding server name
    #[error("Could not derive a unique name for server '{name}'")]
    RenameExhausted {
        /// The colliding server name
        name: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for McpSyncError {
    fn clone(&self) -> Self {
        match self {
            Self::Format {
                format,
                reason,
            } => Self::Format {
                format: format.clone(),
                reason: reason.clone(),
            },
            Self::UnsupportedVariant {
                name,
                variant,
                format,
            } => Self::UnsupportedVariant {
                name: name.clone(),
                variant: variant.clone(),
                format: format.clone(),
            },
            Self::Validation {
                name,
                reason,
            } => Self::Validation {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::StaleWrite {
                path,
            } => Self::StaleWrite {
                path: path.clone(),
            },
            Self::Migration {
                path,
                reason,
            } => Self::Migration {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ServerNotFound {
                name,
                closest,
            } => Self::ServerNotFound {
                name: name.clone(),
                closest: closest.clone(),
            },
            Self::UnknownClient {
                name,
            } => Self::UnknownClient {
                name: name.clone(),
            },
            Self::RenameExhausted {
                name,
            } => Self::RenameExhausted {
                name: name.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON parsing error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`McpSyncError`] and adds optional user-friendly
/// messages, suggestions for resolution, and additional details. This is the
/// primary way MCPSYNC presents errors to CLI users.
///
/// # Display Format
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use mcpsync_cli::core::{ErrorContext, McpSyncError};
///
/// let error = McpSyncError::StaleWrite {
///     path: "~/.config/mcpsync/servers.json".to_string(),
/// };
/// let context = ErrorContext::new(error)
///     .with_suggestion("Re-run the command to pick up the latest state")
///     .with_details("Another process modified the store between read and write");
///
/// context.display(); // Prints colored error to stderr
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: McpSyncError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`McpSyncError`]
    ///
    /// This creates a basic error context with no additional suggestions or
    /// details. Use [`with_suggestion`](Self::with_suggestion) and
    /// [`with_details`](Self::with_details) to add user-friendly information.
    #[must_use]
    pub const fn new(error: McpSyncError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions should be actionable steps that users can take to resolve
    /// the error. They are displayed in green in the terminal.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    ///
    /// Details provide context about why the error occurred. They are
    /// displayed in yellow in the terminal.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// Prints the error, details, and suggestion to stderr using color coding:
    /// error message in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Find the closest known name to a mistyped one.
///
/// Returns the candidate with the highest Jaro-Winkler similarity to
/// `target`, provided the similarity clears a threshold high enough to
/// avoid absurd suggestions. Used to populate
/// [`McpSyncError::ServerNotFound::closest`].
///
/// # Examples
///
/// ```rust
/// use mcpsync_cli::core::closest_match;
///
/// let names = ["context7".to_string(), "filesystem".to_string()];
/// assert_eq!(closest_match("contxt7", names.iter()), Some("context7".to_string()));
/// assert_eq!(closest_match("zzz", names.iter()), None);
/// ```
pub fn closest_match<'a, I>(target: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    candidates
        .into_iter()
        .map(|candidate| (strsim::jaro_winkler(target, candidate), candidate))
        .filter(|(score, _)| *score >= 0.8)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, candidate)| candidate.clone())
}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// This function is the main entry point for converting arbitrary errors into
/// user-friendly error messages for CLI display. It recognizes common error
/// types and provides appropriate context and suggestions.
///
/// # Error Recognition
///
/// The function recognizes and provides specific handling for:
/// - [`McpSyncError`] variants with tailored suggestions
/// - [`std::io::Error`] with filesystem-specific guidance
/// - [`serde_json::Error`] and [`toml::de::Error`] with syntax help
/// - Generic errors with their full cause chain
///
/// # Examples
///
/// ```rust,no_run
/// use mcpsync_cli::core::{McpSyncError, user_friendly_error};
///
/// let error = McpSyncError::UnknownClient {
///     name: "cursor".to_string(),
/// };
/// let context = user_friendly_error(anyhow::Error::from(error));
///
/// context.display(); // Shows the known client identifiers
/// ```
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Check for specific error types and provide helpful suggestions
    if let Some(sync_error) = error.downcast_ref::<McpSyncError>() {
        return create_error_context(sync_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(McpSyncError::IoError(std::io::Error::new(
                    io_error.kind(),
                    io_error.to_string(),
                )))
                .with_suggestion(
                    "Check file ownership, or re-run with permissions to the config directory",
                )
                .with_details(
                    "A client configuration file or the store could not be read or written",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(McpSyncError::IoError(std::io::Error::new(
                    io_error.kind(),
                    io_error.to_string(),
                )))
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details("A required file or directory cannot be found");
            }
            _ => {}
        }
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(McpSyncError::Format {
            format: "json".to_string(),
            reason: json_error.to_string(),
        })
        .with_suggestion("Check the JSON syntax: quotes, commas, and brackets must balance")
        .with_details("JSON parsing errors are usually caused by trailing commas or unquoted keys");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(McpSyncError::Format {
            format: "toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax: verify quotes, brackets, and table headers")
        .with_details(
            "TOML parsing errors are usually caused by syntax issues like missing quotes or mismatched brackets",
        );
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();

    let chain: Vec<String> = error
        .chain()
        .skip(1) // Skip the root cause which is already in to_string()
        .map(std::string::ToString::to_string)
        .collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(McpSyncError::Other {
        message,
    })
}

/// Create appropriate [`ErrorContext`] with suggestions for specific errors
///
/// Maps each [`McpSyncError`] variant to an [`ErrorContext`] with tailored
/// suggestions and details. Used by [`user_friendly_error`] to provide
/// consistent, helpful error messages.
fn create_error_context(error: McpSyncError) -> ErrorContext {
    match &error {
        McpSyncError::Format { format, .. } => {
            let format = format.clone();
            ErrorContext::new(error.clone())
                .with_suggestion(format!(
                    "Check the {format} syntax of the file. A partial edit or merge conflict marker is the usual cause"
                ))
                .with_details("The file could not be parsed; no changes were written")
        }

        McpSyncError::UnsupportedVariant { name, format, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Remove '{name}' from the {format} client's targets, or use a transport that format supports"
            ))
            .with_details(
                "Transport variants are written whole; fields are never silently dropped to force a fit",
            ),

        McpSyncError::Validation { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Stdio servers need a command; http servers need a url. Provide the missing field",
            )
            .with_details("A server definition declares one transport and must carry its required fields"),

        McpSyncError::StaleWrite { path } => ErrorContext::new(error.clone())
            .with_suggestion("Re-run the command; it will pick up the latest on-disk state")
            .with_details(format!(
                "{path} was modified by another process between read and write. The write was refused to avoid losing those changes"
            )),

        McpSyncError::Migration { path, .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Inspect the store file by hand, or restore the most recent .backup-* copy next to it",
            )
            .with_details(format!("The original file at {path} was left untouched")),

        McpSyncError::ServerNotFound { name, closest } => {
            let ctx = ErrorContext::new(error.clone()).with_details(format!(
                "No server named '{name}' exists in the store or any client configuration"
            ));
            match closest {
                Some(closest) => ctx.with_suggestion(format!("Did you mean '{closest}'?")),
                None => ctx.with_suggestion("Run 'mcpsync list' to see the known servers"),
            }
        }

        McpSyncError::UnknownClient { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Known clients are: claude, gemini, codex")
            .with_details("Client identifiers are case-sensitive"),

        _ => ErrorContext::new(error.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = McpSyncError::ServerNotFound {
            name: "test".to_string(),
            closest: None,
        };
        assert_eq!(error.to_string(), "Server 'test' not found");

        let error = McpSyncError::Validation {
            name: "fs".to_string(),
            reason: "stdio transport requires a command".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid server definition 'fs': stdio transport requires a command"
        );

        let error = McpSyncError::UnsupportedVariant {
            name: "context7".to_string(),
            variant: "http".to_string(),
            format: "legacy".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Server 'context7': transport 'http' cannot be expressed in legacy format"
        );

        let error = McpSyncError::StaleWrite {
            path: "/tmp/servers.json".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "File changed on disk since it was last read: /tmp/servers.json"
        );
    }

    #[test]
    fn test_error_context() {
        let ctx = ErrorContext::new(McpSyncError::UnknownClient {
            name: "cursor".to_string(),
        })
        .with_suggestion("Known clients are: claude, gemini, codex")
        .with_details("Client identifiers are case-sensitive");

        assert_eq!(ctx.suggestion, Some("Known clients are: claude, gemini, codex".to_string()));
        assert_eq!(ctx.details, Some("Client identifiers are case-sensitive".to_string()));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(McpSyncError::UnknownClient {
            name: "cursor".to_string(),
        })
        .with_suggestion("Known clients are: claude, gemini, codex");

        let display = format!("{ctx}");
        assert!(display.contains("Unknown client 'cursor'"));
        assert!(display.contains("Known clients are"));
    }

    #[test]
    fn test_closest_match_finds_near_name() {
        let names = vec!["context7".to_string(), "filesystem".to_string(), "github".to_string()];
        assert_eq!(closest_match("contxt7", names.iter()), Some("context7".to_string()));
        assert_eq!(closest_match("filesytem", names.iter()), Some("filesystem".to_string()));
    }

    #[test]
    fn test_closest_match_rejects_distant_name() {
        let names = vec!["context7".to_string(), "filesystem".to_string()];
        assert_eq!(closest_match("postgres", names.iter()), None);
        assert_eq!(closest_match("x", [].iter()), None);
    }

    #[test]
    fn test_user_friendly_error_server_not_found_with_closest() {
        let error = McpSyncError::ServerNotFound {
            name: "contxt7".to_string(),
            closest: Some("context7".to_string()),
        };
        let ctx = user_friendly_error(anyhow::Error::from(error));
        assert!(ctx.suggestion.unwrap().contains("context7"));
    }

    #[test]
    fn test_user_friendly_error_permission_denied() {
        use std::io::{Error, ErrorKind};

        let io_error = Error::new(ErrorKind::PermissionDenied, "access denied");
        let anyhow_error = anyhow::Error::from(io_error);

        let ctx = user_friendly_error(anyhow_error);
        match ctx.error {
            McpSyncError::IoError(_) => {}
            _ => panic!("Expected IoError"),
        }
        assert!(ctx.suggestion.is_some());
        assert!(ctx.details.is_some());
    }

    #[test]
    fn test_user_friendly_error_json_parse() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{broken");

        if let Err(e) = result {
            let ctx = user_friendly_error(anyhow::Error::from(e));
            match ctx.error {
                McpSyncError::Format {
                    format, ..
                } => assert_eq!(format, "json"),
                _ => panic!("Expected Format error"),
            }
            assert!(ctx.suggestion.unwrap().contains("JSON syntax"));
        }
    }

    #[test]
    fn test_user_friendly_error_toml_parse() {
        let result: Result<toml::Value, _> = toml::from_str("invalid = toml {");

        if let Err(e) = result {
            let ctx = user_friendly_error(anyhow::Error::from(e));
            match ctx.error {
                McpSyncError::Format {
                    format, ..
                } => assert_eq!(format, "toml"),
                _ => panic!("Expected Format error"),
            }
            assert!(ctx.suggestion.unwrap().contains("TOML syntax"));
        }
    }

    #[test]
    fn test_user_friendly_error_generic() {
        let error = anyhow::anyhow!("Generic error");
        let ctx = user_friendly_error(error);

        match ctx.error {
            McpSyncError::Other {
                message,
            } => assert_eq!(message, "Generic error"),
            _ => panic!("Expected Other error"),
        }
    }

    #[test]
    fn test_user_friendly_error_chain() {
        let root = anyhow::anyhow!("root cause");
        let wrapped = root.context("outer operation failed");
        let ctx = user_friendly_error(wrapped);

        match ctx.error {
            McpSyncError::Other {
                message,
            } => {
                assert!(message.contains("outer operation failed"));
                assert!(message.contains("Caused by:"));
                assert!(message.contains("root cause"));
            }
            _ => panic!("Expected Other error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        use std::io::Error;

        let io_error = Error::other("test error");
        let sync_error = McpSyncError::from(io_error);

        match sync_error {
            McpSyncError::IoError(_) => {}
            _ => panic!("Expected IoError"),
        }
    }

    #[test]
    fn test_create_error_context_stale_write() {
        let ctx = create_error_context(McpSyncError::StaleWrite {
            path: "/tmp/servers.json".to_string(),
        });
        assert!(ctx.suggestion.unwrap().contains("Re-run"));
        assert!(ctx.details.unwrap().contains("/tmp/servers.json"));
    }

    #[test]
    fn test_create_error_context_migration() {
        let ctx = create_error_context(McpSyncError::Migration {
            path: "/tmp/servers.json".to_string(),
            reason: "mixed v1 and v2 entries".to_string(),
        });
        assert!(ctx.suggestion.unwrap().contains("backup"));
        assert!(ctx.details.unwrap().contains("left untouched"));
    }

    #[test]
    fn test_error_clone_preserves_message() {
        let error1 = McpSyncError::UnsupportedVariant {
            name: "a".to_string(),
            variant: "http".to_string(),
            format: "toml".to_string(),
        };
        let error2 = error1.clone();
        assert_eq!(error1.to_string(), error2.to_string());

        // Non-Clone inner errors degrade to Other with the same message
        let io = McpSyncError::IoError(std::io::Error::other("oops"));
        let cloned = io.clone();
        match cloned {
            McpSyncError::Other {
                message,
            } => assert!(message.contains("oops")),
            _ => panic!("Expected Other after cloning IoError"),
        }
    }
}
