use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::McpSyncError;

/// The transport a server definition uses.
///
/// This is a closed set. Wire documents carrying any other shape are
/// rejected during conversion, so code downstream of
/// [`ServerRecord::from_raw`] never has to handle a half-formed definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// A local process launched over stdio.
    Stdio {
        /// The command to execute to start the server
        command: String,
        /// Arguments to pass to the command
        args: Vec<String>,
        /// Environment variables to set when running the server
        env: BTreeMap<String, String>,
    },
    /// A remote endpoint reached over HTTP.
    Http {
        /// Server URL
        url: String,
        /// HTTP headers sent with each request
        headers: BTreeMap<String, String>,
    },
}

impl TransportKind {
    /// Short label for display and error messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Http { .. } => "http",
        }
    }

    /// One-line summary of the launch command or endpoint.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Stdio { command, args, .. } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{} {}", command, args.join(" "))
                }
            }
            Self::Http { url, .. } => url.clone(),
        }
    }
}

/// Canonical description of one MCP server, independent of any client's
/// on-disk syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    /// Server name, the identity key across all clients
    pub name: String,
    /// How the server is reached
    pub transport: TransportKind,
    /// Inline enabled flag, for clients that support one. `None` means the
    /// client file does not carry the flag, which reads as enabled.
    pub enabled: Option<bool>,
}

impl ServerRecord {
    /// Creates a record, validating the server name.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty or contains
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn new(name: impl Into<String>, transport: TransportKind) -> Result<Self> {
        let name = name.into();
        validate_server_name(&name)?;
        Ok(Self { name, transport, enabled: None })
    }

    /// Classifies a wire entry into a record.
    ///
    /// An explicit `type` field wins. Without one, a `command` key selects
    /// the stdio variant and a `url` key selects http. The legacy `sse`
    /// type reads as http and is normalized to `http` on the next write.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the entry when it is neither
    /// variant, carries an unknown `type`, or has an empty command or url.
    pub fn from_raw(name: impl Into<String>, raw: RawServerEntry) -> Result<Self> {
        let name = name.into();
        validate_server_name(&name)?;

        let RawServerEntry { command, args, env, transport_type, url, headers, enabled, .. } = raw;

        let stdio = |name: String, command: String, enabled: Option<bool>| -> Result<Self> {
            if command.trim().is_empty() {
                return Err(McpSyncError::Validation {
                    name,
                    reason: "command must not be empty".to_string(),
                }
                .into());
            }
            Ok(Self {
                name,
                transport: TransportKind::Stdio {
                    command,
                    args: args.clone(),
                    env: env.clone().unwrap_or_default(),
                },
                enabled,
            })
        };
        let http = |name: String, url: String, enabled: Option<bool>| -> Result<Self> {
            if url.trim().is_empty() {
                return Err(McpSyncError::Validation {
                    name,
                    reason: "url must not be empty".to_string(),
                }
                .into());
            }
            Ok(Self {
                name,
                transport: TransportKind::Http { url, headers: headers.clone().unwrap_or_default() },
                enabled,
            })
        };

        match transport_type.as_deref() {
            Some("stdio") => {
                let command = command.ok_or_else(|| McpSyncError::Validation {
                    name: name.clone(),
                    reason: "transport type is \"stdio\" but no command is set".to_string(),
                })?;
                stdio(name, command, enabled)
            }
            Some("http") | Some("sse") => {
                let url = url.ok_or_else(|| McpSyncError::Validation {
                    name: name.clone(),
                    reason: "transport type is \"http\" but no url is set".to_string(),
                })?;
                http(name, url, enabled)
            }
            Some(other) => Err(McpSyncError::Validation {
                name,
                reason: format!("unknown transport type \"{other}\""),
            }
            .into()),
            None => {
                if let Some(command) = command {
                    stdio(name, command, enabled)
                } else if let Some(url) = url {
                    http(name, url, enabled)
                } else {
                    Err(McpSyncError::Validation {
                        name,
                        reason: "entry has neither a command nor a url".to_string(),
                    }
                    .into())
                }
            }
        }
    }

    /// Converts the record back to its wire shape.
    ///
    /// Stdio entries omit the `type` field, matching what the clients
    /// themselves write. Http entries always carry `type = "http"`.
    #[must_use]
    pub fn to_raw(&self) -> RawServerEntry {
        match &self.transport {
            TransportKind::Stdio { command, args, env } => RawServerEntry {
                command: Some(command.clone()),
                args: args.clone(),
                env: if env.is_empty() { None } else { Some(env.clone()) },
                transport_type: None,
                url: None,
                headers: None,
                enabled: self.enabled,
                extra: BTreeMap::new(),
            },
            TransportKind::Http { url, headers } => RawServerEntry {
                command: None,
                args: Vec::new(),
                env: None,
                transport_type: Some("http".to_string()),
                url: Some(url.clone()),
                headers: if headers.is_empty() { None } else { Some(headers.clone()) },
                enabled: self.enabled,
                extra: BTreeMap::new(),
            },
        }
    }

    /// Whether the inline flag reads as enabled. Absent means enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// One server entry as it appears on the wire.
///
/// This is the JSON shape used by the claude and gemini configuration files
/// and by the enablement store; the TOML adapter builds the same structure
/// from `[mcp_servers.<name>]` tables. Unknown client-specific keys are
/// captured in `extra` so they survive a read-modify-write cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawServerEntry {
    /// The command to execute (stdio servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments to pass to the command (stdio servers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment variables for the server process (stdio servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,

    /// Explicit transport type. When present it wins over key inference.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport_type: Option<String>,

    /// Server URL (http servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP headers (http servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Inline enabled flag, for clients that support one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Client-specific keys preserved from the original document
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Validates a server name.
///
/// Names must start with an alphanumeric character and may contain only
/// alphanumerics, dots, underscores, and hyphens. Case is preserved.
///
/// # Errors
///
/// Returns a validation error describing the offending name.
pub fn validate_server_name(name: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$")?;
    if pattern.is_match(name) {
        return Ok(());
    }

    let reason = if name.is_empty() {
        "server name must not be empty".to_string()
    } else {
        "server names must start with a letter or digit and contain only \
        letters, digits, dots, underscores, and hyphens"
            .to_string()
    };
    Err(McpSyncError::Validation { name: name.to_string(), reason }.into())
}
