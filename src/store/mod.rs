//! The enablement store: per-client disablement state plus preserved
//! server configurations.
//!
//! Client configuration files can only say which servers exist. Disabling a
//! server for one client means removing it from that client's file, and
//! without somewhere to keep the definition it would be gone for good. The
//! store is that somewhere: a JSON map from server name to an
//! [`EnablementEntry`] holding the complete configuration and the set of
//! clients it is disabled for.
//!
//! A server disabled for every known client is a fully valid state: the
//! definition is preserved and can be re-enabled at any time. Entries come
//! into existence on first disable (or when consolidation records a
//! promoted configuration) and leave only on permanent delete.
//!
//! # File Format
//!
//! ```json
//! {
//!   "context7": {
//!     "config": {"command": "npx", "args": ["-y", "@upstash/context7-mcp"]},
//!     "disabled_for": ["codex"]
//!   }
//! }
//! ```
//!
//! An earlier layout stored the server configuration directly under the
//! name with no wrapper. [`EnablementStore::load`] detects that shape and
//! migrates it in place: the original file is backed up first, every
//! migrated entry is marked disabled for all known clients (the legacy
//! meaning of being listed), and a file mixing both shapes is refused.
//!
//! # Concurrency
//!
//! The store assumes a single writer. Every load captures a file
//! fingerprint; [`EnablementStore::save`] re-checks it and refuses to
//! overwrite a file that changed since it was read.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::constants::STORE_FILE;
use crate::core::{McpSyncError, closest_match};
use crate::server::{ClientKind, ClientRegistry, RawServerEntry, ServerRecord};
use crate::utils::{FileFingerprint, atomic_write, platform, read_text_file, timestamped_backup};

/// One server's preserved configuration and disablement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnablementEntry {
    /// Complete wire-form configuration, kept even while disabled everywhere
    pub config: RawServerEntry,

    /// Clients this server is currently disabled for
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub disabled_for: BTreeSet<ClientKind>,
}

/// One enablement transition, reported back to callers after it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnablementChange {
    /// The server that changed
    pub server: String,
    /// The client it changed for
    pub client: ClientKind,
    /// The new state
    pub enabled: bool,
}

/// On-disk map of server enablement state.
#[derive(Debug)]
pub struct EnablementStore {
    path: PathBuf,
    entries: BTreeMap<String, EnablementEntry>,
    fingerprint: Option<FileFingerprint>,
}

impl EnablementStore {
    /// Default store location inside this tool's configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(platform::config_dir()?.join(STORE_FILE))
    }

    /// Loads the store, migrating a legacy-layout file in place.
    ///
    /// A missing or empty file yields an empty store. The registry supplies
    /// the set of known clients that migrated legacy entries are marked
    /// disabled for.
    ///
    /// # Errors
    ///
    /// Returns a format error for unreadable JSON and a migration error
    /// for files mixing legacy and current entry shapes or holding invalid
    /// legacy definitions. Migration never runs on a partially readable
    /// file, so the original content stays intact.
    pub fn load(path: impl Into<PathBuf>, registry: &ClientRegistry) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!("store {} does not exist, starting empty", path.display());
            return Ok(Self { path, entries: BTreeMap::new(), fingerprint: None });
        }

        let content = read_text_file(&path)?;
        let fingerprint = FileFingerprint::capture(&path)?;
        if content.trim().is_empty() {
            return Ok(Self { path, entries: BTreeMap::new(), fingerprint });
        }

        let doc: Value = serde_json::from_str(&content).map_err(|e| McpSyncError::Format {
            format: "json".to_string(),
            reason: format!("store file {}: {e}", path.display()),
        })?;
        let Value::Object(map) = doc else {
            return Err(McpSyncError::Format {
                format: "json".to_string(),
                reason: format!("store file {} must be a JSON object", path.display()),
            }
            .into());
        };

        if map.is_empty() {
            return Ok(Self { path, entries: BTreeMap::new(), fingerprint });
        }

        let with_config = map
            .values()
            .filter(|v| v.as_object().is_some_and(|o| o.contains_key("config")))
            .count();

        if with_config == map.len() {
            let entries: BTreeMap<String, EnablementEntry> =
                serde_json::from_value(Value::Object(map)).map_err(|e| McpSyncError::Format {
                    format: "json".to_string(),
                    reason: format!("store file {}: {e}", path.display()),
                })?;
            Ok(Self { path, entries, fingerprint })
        } else if with_config == 0 {
            Self::migrate_legacy(path, map, fingerprint, registry)
        } else {
            Err(McpSyncError::Migration {
                path: path.display().to_string(),
                reason: "file mixes legacy and current entry shapes".to_string(),
            }
            .into())
        }
    }

    /// Loads the store from its default location.
    ///
    /// # Errors
    ///
    /// Same conditions as [`EnablementStore::load`].
    pub fn load_default(registry: &ClientRegistry) -> Result<Self> {
        Self::load(Self::default_path()?, registry)
    }

    /// Legacy layout: `name -> <wire config>`. Being listed meant disabled
    /// everywhere, so migrated entries carry all known clients.
    fn migrate_legacy(
        path: PathBuf,
        map: serde_json::Map<String, Value>,
        fingerprint: Option<FileFingerprint>,
        registry: &ClientRegistry,
    ) -> Result<Self> {
        let backup = timestamped_backup(&path)?;
        let all_clients: BTreeSet<ClientKind> = registry.kinds().cloned().collect();

        let mut entries = BTreeMap::new();
        for (name, value) in map {
            let migration_error = |reason: String| McpSyncError::Migration {
                path: path.display().to_string(),
                reason,
            };

            let config: RawServerEntry = serde_json::from_value(value)
                .map_err(|e| migration_error(format!("entry '{name}': {e}")))?;
            ServerRecord::from_raw(name.clone(), config.clone())
                .map_err(|e| migration_error(format!("entry '{name}': {e}")))?;

            entries.insert(name, EnablementEntry { config, disabled_for: all_clients.clone() });
        }

        let mut store = Self { path, entries, fingerprint };
        store.save()?;

        let backup_note = backup
            .map(|b| format!(" (previous file at {})", b.display()))
            .unwrap_or_default();
        tracing::info!(
            "migrated {} legacy server entries in {}{backup_note}",
            store.entries.len(),
            store.path.display()
        );
        Ok(store)
    }

    /// Writes the store back to disk atomically.
    ///
    /// # Errors
    ///
    /// Returns a stale-write error if the file changed since it was loaded;
    /// nothing is written in that case.
    pub fn save(&mut self) -> Result<()> {
        if !FileFingerprint::verify(self.fingerprint.as_ref(), &self.path)? {
            return Err(McpSyncError::StaleWrite { path: self.path.display().to_string() }.into());
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.path, json.as_bytes())?;
        self.fingerprint = FileFingerprint::capture(&self.path)?;
        Ok(())
    }

    /// Location of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up one entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EnablementEntry> {
        self.entries.get(name)
    }

    /// All entries, ordered by server name.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, EnablementEntry> {
        &self.entries
    }

    /// All server names in the store.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records or refreshes a server's preserved configuration, keeping
    /// any existing disablement state.
    pub fn upsert(&mut self, name: impl Into<String>, config: RawServerEntry) {
        let name = name.into();
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.config = config;
        } else {
            self.entries.insert(name, EnablementEntry { config, disabled_for: BTreeSet::new() });
        }
    }

    /// Permanently removes an entry, returning it if it existed.
    pub fn remove(&mut self, name: &str) -> Option<EnablementEntry> {
        self.entries.remove(name)
    }

    /// Whether a server is enabled for a client. Servers the store has
    /// never heard of are enabled by definition.
    #[must_use]
    pub fn is_enabled(&self, name: &str, client: &ClientKind) -> bool {
        self.entries.get(name).is_none_or(|entry| !entry.disabled_for.contains(client))
    }

    /// Flips one server's state for one client.
    ///
    /// # Errors
    ///
    /// Returns a server-not-found error (with a did-you-mean candidate)
    /// when the store has no entry for the name.
    pub fn set_enabled(
        &mut self,
        name: &str,
        client: &ClientKind,
        enabled: bool,
    ) -> Result<EnablementChange> {
        let Some(entry) = self.entries.get_mut(name) else {
            let closest = closest_match(name, self.entries.keys());
            return Err(McpSyncError::ServerNotFound { name: name.to_string(), closest }.into());
        };

        if enabled {
            entry.disabled_for.remove(client);
        } else {
            entry.disabled_for.insert(client.clone());
        }

        Ok(EnablementChange { server: name.to_string(), client: client.clone(), enabled })
    }
}
