use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::McpSyncError;
use crate::utils::platform;

/// Identifier for one AI-assistant client, such as `claude` or `codex`.
///
/// Kinds are compared case-insensitively by normalizing to lowercase at
/// construction. The set of kinds is open: the standard registry knows
/// three, and additional ones can be registered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientKind(String);

impl ClientKind {
    /// Creates a kind, normalizing the name to lowercase.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    /// The Claude Code client.
    #[must_use]
    pub fn claude() -> Self {
        Self("claude".to_string())
    }

    /// The Gemini CLI client.
    #[must_use]
    pub fn gemini() -> Self {
        Self("gemini".to_string())
    }

    /// The Codex CLI client.
    #[must_use]
    pub fn codex() -> Self {
        Self("codex".to_string())
    }

    /// The kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-disk syntax of a client's configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON documents with an `mcpServers` map (claude, gemini)
    Json,
    /// TOML documents with `[mcp_servers.<name>]` tables (codex)
    Toml,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Toml => write!(f, "toml"),
        }
    }
}

/// Everything the engine needs to know about one client.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    /// The client's identifier
    pub kind: ClientKind,
    /// Human-readable name for output
    pub display_name: String,
    /// On-disk configuration syntax
    pub format: ConfigFormat,
    /// Absolute path of the user-level configuration file
    pub config_path: PathBuf,
    /// Executable looked up on `PATH` to decide client availability
    pub binary: String,
}

/// Ordered set of known clients.
///
/// Registry order is significant: when two clients were modified at the
/// same instant, the earlier entry wins merge conflicts. The standard
/// order is claude, gemini, codex.
///
/// # Examples
///
/// ```rust
/// use mcpsync_cli::server::{ClientKind, ClientRegistry};
/// use std::path::Path;
///
/// let registry = ClientRegistry::with_home(Path::new("/home/alice"));
/// let claude = registry.get(&ClientKind::claude()).unwrap();
/// assert_eq!(claude.config_path, Path::new("/home/alice/.claude.json"));
/// ```
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    specs: Vec<ClientSpec>,
}

impl ClientRegistry {
    /// Builds the standard registry rooted at the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn standard() -> Result<Self> {
        Ok(Self::with_home(&platform::home_dir()?))
    }

    /// Builds the standard registry rooted at an explicit home directory.
    #[must_use]
    pub fn with_home(home: &Path) -> Self {
        Self {
            specs: vec![
                ClientSpec {
                    kind: ClientKind::claude(),
                    display_name: "Claude Code".to_string(),
                    format: ConfigFormat::Json,
                    config_path: home.join(".claude.json"),
                    binary: "claude".to_string(),
                },
                ClientSpec {
                    kind: ClientKind::gemini(),
                    display_name: "Gemini CLI".to_string(),
                    format: ConfigFormat::Json,
                    config_path: home.join(".gemini").join("settings.json"),
                    binary: "gemini".to_string(),
                },
                ClientSpec {
                    kind: ClientKind::codex(),
                    display_name: "Codex CLI".to_string(),
                    format: ConfigFormat::Toml,
                    config_path: home.join(".codex").join("config.toml"),
                    binary: "codex".to_string(),
                },
            ],
        }
    }

    /// Registers an additional client, or replaces the spec of an existing
    /// kind. New kinds are appended, which gives them the lowest merge
    /// precedence.
    pub fn register(&mut self, spec: ClientSpec) {
        if let Some(existing) = self.specs.iter_mut().find(|s| s.kind == spec.kind) {
            *existing = spec;
        } else {
            self.specs.push(spec);
        }
    }

    /// Looks up the spec for a kind.
    #[must_use]
    pub fn get(&self, kind: &ClientKind) -> Option<&ClientSpec> {
        self.specs.iter().find(|s| &s.kind == kind)
    }

    /// Position of a kind in registry order, used as the merge tiebreak.
    #[must_use]
    pub fn index_of(&self, kind: &ClientKind) -> Option<usize> {
        self.specs.iter().position(|s| &s.kind == kind)
    }

    /// All registered specs in registry order.
    #[must_use]
    pub fn specs(&self) -> &[ClientSpec] {
        &self.specs
    }

    /// All registered kinds in registry order.
    pub fn kinds(&self) -> impl Iterator<Item = &ClientKind> {
        self.specs.iter().map(|s| &s.kind)
    }

    /// Resolves a user-supplied client name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an unknown-client error if the name is not registered.
    pub fn parse_kind(&self, name: &str) -> Result<ClientKind> {
        let kind = ClientKind::new(name);
        if self.get(&kind).is_some() {
            Ok(kind)
        } else {
            Err(McpSyncError::UnknownClient { name: name.to_string() }.into())
        }
    }

    /// Comma-separated list of known client names, for error messages.
    #[must_use]
    pub fn known_names(&self) -> String {
        self.kinds().map(ClientKind::as_str).collect::<Vec<_>>().join(", ")
    }
}
