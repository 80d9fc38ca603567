//! High-level facade over the store, sync engine, discovery, and
//! consolidation.
//!
//! CLI commands (and any other frontend) talk to a [`Manager`] instead of
//! wiring the pieces together themselves. Every operation returns typed
//! data or a typed error; nothing panics across this boundary.
//!
//! The enable/disable operations act immediately: disabling a server
//! captures its definition into the store and removes it from the client's
//! file in the same call, so the change is visible to the client without a
//! separate sync. Re-enabling writes the stored definition back.

use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::consolidate::{self, ConsolidationReport};
use crate::core::{McpSyncError, closest_match};
use crate::discovery::{DiscoveryService, ProgressFn, ProjectServerRecord, ScanOptions};
use crate::server::{
    ClientKind, ClientRegistry, RawServerEntry, ServerRecord, validate_server_name,
};
use crate::store::{EnablementChange, EnablementStore};
use crate::sync::{self, SyncReport, SyncStrategy};
use crate::utils::timestamped_backup;

/// Where a listed server lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ServerScope {
    /// Global: client files and/or the enablement store
    Global,
    /// Scoped to one project's `.mcp.json`
    Project { path: PathBuf },
}

/// Per-client placement of one global server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientState {
    /// The server appears in this client's file
    pub present: bool,
    /// The store considers it enabled for this client
    pub enabled: bool,
}

/// One row of [`Manager::get_all`] output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerOverview {
    pub name: String,
    #[serde(flatten)]
    pub scope: ServerScope,
    /// Wire-shape definition, from the store or the first client that has
    /// one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RawServerEntry>,
    /// Empty for project rows
    pub clients: BTreeMap<ClientKind, ClientState>,
    /// Project rows: the name also exists globally or in another project
    pub is_duplicate: bool,
}

/// What [`Manager::delete`] actually removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Clients whose files were rewritten without the server
    pub removed_from: Vec<ClientKind>,
    /// Whether the store entry itself was dropped
    pub dropped_from_store: bool,
}

/// Facade tying together the registry, store, sync engine, discovery, and
/// consolidation.
pub struct Manager {
    registry: ClientRegistry,
    store: EnablementStore,
    discovery: DiscoveryService,
    project_roots: Vec<PathBuf>,
}

impl Manager {
    /// Creates a manager with the standard registry and default store path.
    ///
    /// # Errors
    ///
    /// Fails if the home directory cannot be determined or the store file
    /// cannot be loaded (including a refused migration).
    pub fn new() -> Result<Self> {
        let registry = ClientRegistry::standard()?;
        let store = EnablementStore::load_default(&registry)?;
        Ok(Self::assemble(registry, store))
    }

    /// Creates a manager reading the store from an explicit path.
    ///
    /// # Errors
    ///
    /// Fails if the home directory cannot be determined or the store file
    /// cannot be loaded.
    pub fn with_store_path(path: impl Into<PathBuf>) -> Result<Self> {
        let registry = ClientRegistry::standard()?;
        let store = EnablementStore::load(path, &registry)?;
        Ok(Self::assemble(registry, store))
    }

    /// Creates a manager with an explicit registry, for embedding and tests.
    ///
    /// # Errors
    ///
    /// Fails if the store file cannot be loaded.
    pub fn with_registry(registry: ClientRegistry, store_path: impl Into<PathBuf>) -> Result<Self> {
        let store = EnablementStore::load(store_path, &registry)?;
        Ok(Self::assemble(registry, store))
    }

    fn assemble(registry: ClientRegistry, store: EnablementStore) -> Self {
        Self {
            registry,
            store,
            discovery: DiscoveryService::new(),
            project_roots: vec![PathBuf::from(".")],
        }
    }

    /// The client registry in use.
    #[must_use]
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// The loaded enablement store.
    #[must_use]
    pub fn store(&self) -> &EnablementStore {
        &self.store
    }

    /// The discovery service, for cancellation from signal handlers.
    #[must_use]
    pub fn discovery(&self) -> &DiscoveryService {
        &self.discovery
    }

    /// Roots scanned when [`get_all`](Self::get_all) includes project scope.
    pub fn set_project_roots(&mut self, roots: Vec<PathBuf>) {
        self.project_roots = roots;
    }

    /// Lists every known server: the union of store entries and client
    /// files, plus project-scoped servers when requested.
    ///
    /// Global rows report, per client, whether the server is present in
    /// that client's file and whether the store considers it enabled.
    /// Clients whose files cannot be read are listed as having nothing
    /// (with a warning) rather than failing the whole listing.
    ///
    /// # Errors
    ///
    /// Fails only when the project scan itself fails.
    pub async fn get_all(&self, include_project_scope: bool) -> Result<Vec<ServerOverview>> {
        let mut views: Vec<(ClientKind, BTreeMap<String, ServerRecord>)> = Vec::new();
        for spec in self.registry.specs() {
            match sync::load_client_view(spec) {
                Ok((view, _)) => views.push((spec.kind.clone(), view.servers)),
                Err(e) => {
                    tracing::warn!("listing without {}: {e:#}", spec.kind);
                    views.push((spec.kind.clone(), BTreeMap::new()));
                }
            }
        }

        let mut names: BTreeSet<String> = self.store.names().map(str::to_string).collect();
        for (_, servers) in &views {
            names.extend(servers.keys().cloned());
        }

        let mut rows = Vec::with_capacity(names.len());
        for name in &names {
            let mut clients = BTreeMap::new();
            for (kind, servers) in &views {
                clients.insert(
                    kind.clone(),
                    ClientState {
                        present: servers.contains_key(name),
                        enabled: self.store.is_enabled(name, kind),
                    },
                );
            }
            let config = self.store.get(name).map(|entry| entry.config.clone()).or_else(|| {
                views.iter().find_map(|(_, servers)| servers.get(name).map(ServerRecord::to_raw))
            });
            rows.push(ServerOverview {
                name: name.clone(),
                scope: ServerScope::Global,
                config,
                clients,
                is_duplicate: false,
            });
        }

        if include_project_scope {
            let records = self.discover(&self.project_roots, false).await?;
            for record in records {
                rows.push(ServerOverview {
                    name: record.name,
                    scope: ServerScope::Project { path: record.project_path },
                    config: Some(record.config.to_raw()),
                    clients: BTreeMap::new(),
                    is_duplicate: record.is_duplicate,
                });
            }
        }

        Ok(rows)
    }

    /// Enables or disables a server for one client, and makes the change
    /// effective in that client's file immediately.
    ///
    /// Disabling captures the server's current definition into the store
    /// (from the client's file, or any other client that has it) before
    /// removing it from the file, so nothing is lost. Enabling writes the
    /// stored definition back into the file if it is absent.
    ///
    /// # Errors
    ///
    /// [`McpSyncError::UnknownClient`] for an unregistered client,
    /// [`McpSyncError::ServerNotFound`] when the server exists nowhere,
    /// plus store and file write failures.
    pub fn set_enabled(
        &mut self,
        name: &str,
        client: &ClientKind,
        enabled: bool,
    ) -> Result<EnablementChange> {
        let spec = self
            .registry
            .get(client)
            .ok_or_else(|| McpSyncError::UnknownClient { name: client.to_string() })?
            .clone();
        let (view, source) = sync::load_client_view(&spec)?;

        if enabled {
            if self.store.get(name).is_none()
                && let Some(record) = self.find_in_clients(name)
            {
                self.store.upsert(name, record.to_raw());
            }
            let change = self.store.set_enabled(name, client, true)?;
            self.store.save()?;

            if !view.servers.contains_key(name)
                && let Some(entry) = self.store.get(name)
            {
                let record = ServerRecord::from_raw(name.to_string(), entry.config.clone())?;
                let mut servers = view.servers;
                servers.insert(name.to_string(), record);
                sync::write_client_file(&spec, &servers, &source)?;
            }
            Ok(change)
        } else {
            // Capture the freshest definition before withholding it
            if let Some(record) = view.servers.get(name) {
                self.store.upsert(name, record.to_raw());
            } else if self.store.get(name).is_none()
                && let Some(record) = self.find_in_clients(name)
            {
                self.store.upsert(name, record.to_raw());
            }
            let change = self.store.set_enabled(name, client, false)?;
            self.store.save()?;

            if view.servers.contains_key(name) {
                let mut servers = view.servers;
                servers.remove(name);
                sync::write_client_file(&spec, &servers, &source)?;
            }
            Ok(change)
        }
    }

    fn find_in_clients(&self, name: &str) -> Option<ServerRecord> {
        for spec in self.registry.specs() {
            match sync::load_client_view(spec) {
                Ok((view, _)) => {
                    if let Some(record) = view.servers.get(name) {
                        return Some(record.clone());
                    }
                }
                Err(e) => tracing::warn!("cannot read {} while resolving '{name}': {e:#}", spec.kind),
            }
        }
        None
    }

    /// Adds (or updates) a server in the store and writes it into the
    /// target clients' files. The store marks it disabled for every
    /// non-target client, so sync will not spread it further.
    ///
    /// # Errors
    ///
    /// [`McpSyncError::UnknownClient`] for an unregistered target,
    /// [`McpSyncError::Validation`] for an invalid name, plus store and
    /// file write failures.
    pub fn add(&mut self, record: &ServerRecord, target_clients: &BTreeSet<ClientKind>) -> Result<()> {
        validate_server_name(&record.name)?;
        for client in target_clients {
            if self.registry.get(client).is_none() {
                return Err(McpSyncError::UnknownClient { name: client.to_string() }.into());
            }
        }

        self.store.upsert(&record.name, record.to_raw());
        for kind in self.registry.kinds() {
            self.store.set_enabled(&record.name, kind, target_clients.contains(kind))?;
        }
        timestamped_backup(self.store.path())?;
        self.store.save()?;

        for client in target_clients {
            let Some(spec) = self.registry.get(client) else { continue };
            let (view, source) = sync::load_client_view(spec)?;
            let mut servers = view.servers;
            servers.insert(record.name.clone(), record.clone());
            sync::write_client_file(spec, &servers, &source)?;
        }

        tracing::info!("added '{}' for {} clients", record.name, target_clients.len());
        Ok(())
    }

    /// Deletes a server from one client, or from everywhere.
    ///
    /// With a client, the server is removed from that client's file and
    /// marked disabled for it in the store; the store entry itself stays
    /// (other clients may still use it). Without a client, the server is
    /// removed from every client file and the store entry is dropped.
    ///
    /// # Errors
    ///
    /// [`McpSyncError::ServerNotFound`] when nothing knows the name,
    /// [`McpSyncError::UnknownClient`] for an unregistered client, plus
    /// file write failures.
    pub fn delete(&mut self, name: &str, client: Option<&ClientKind>) -> Result<DeleteOutcome> {
        match client {
            Some(client) => self.delete_for_client(name, client),
            None => self.delete_everywhere(name),
        }
    }

    fn delete_for_client(&mut self, name: &str, client: &ClientKind) -> Result<DeleteOutcome> {
        let spec = self
            .registry
            .get(client)
            .ok_or_else(|| McpSyncError::UnknownClient { name: client.to_string() })?
            .clone();
        let (view, source) = sync::load_client_view(&spec)?;

        let present = view.servers.contains_key(name);
        let in_store = self.store.get(name).is_some();
        if !present && !in_store {
            let mut known: BTreeSet<String> = self.store.names().map(str::to_string).collect();
            known.extend(view.servers.keys().cloned());
            return Err(McpSyncError::ServerNotFound {
                name: name.to_string(),
                closest: closest_match(name, known.iter()),
            }
            .into());
        }

        if present {
            let mut servers = view.servers;
            servers.remove(name);
            sync::write_client_file(&spec, &servers, &source)?;
        }
        if in_store {
            self.store.set_enabled(name, client, false)?;
            self.store.save()?;
        }

        Ok(DeleteOutcome {
            removed_from: if present { vec![client.clone()] } else { Vec::new() },
            dropped_from_store: false,
        })
    }

    fn delete_everywhere(&mut self, name: &str) -> Result<DeleteOutcome> {
        let mut removed_from = Vec::new();
        let mut known: BTreeSet<String> = self.store.names().map(str::to_string).collect();

        for spec in self.registry.specs() {
            match sync::load_client_view(spec) {
                Ok((view, source)) => {
                    known.extend(view.servers.keys().cloned());
                    if view.servers.contains_key(name) {
                        let mut servers = view.servers;
                        servers.remove(name);
                        sync::write_client_file(spec, &servers, &source)?;
                        removed_from.push(spec.kind.clone());
                    }
                }
                Err(e) => {
                    tracing::warn!("cannot remove '{name}' from {}: {e:#}", spec.kind);
                }
            }
        }

        let dropped_from_store = self.store.remove(name).is_some();
        if dropped_from_store {
            timestamped_backup(self.store.path())?;
            self.store.save()?;
        }

        if removed_from.is_empty() && !dropped_from_store {
            return Err(McpSyncError::ServerNotFound {
                name: name.to_string(),
                closest: closest_match(name, known.iter()),
            }
            .into());
        }

        tracing::info!(
            "deleted '{name}' from {} clients (store entry dropped: {dropped_from_store})",
            removed_from.len()
        );
        Ok(DeleteOutcome { removed_from, dropped_from_store })
    }

    /// Reconciles all client files against each other and the store.
    ///
    /// # Errors
    ///
    /// An error means sync could not start; per-client failures are
    /// reported inside the returned [`SyncReport`].
    pub fn sync(&self, strategy: &SyncStrategy) -> Result<SyncReport> {
        sync::sync_clients(&self.registry, &self.store, strategy)
    }

    /// Scans the given roots for project-scoped servers.
    ///
    /// Global names (store entries and client-file servers) are passed to
    /// the scan so project copies of them are flagged as duplicates.
    ///
    /// # Errors
    ///
    /// Propagates scan failures, including cancellation.
    pub async fn discover(
        &self,
        roots: &[PathBuf],
        refresh: bool,
    ) -> Result<Vec<ProjectServerRecord>> {
        self.discover_with_progress(roots, refresh, None).await
    }

    /// [`discover`](Self::discover) with a progress callback for UIs.
    ///
    /// # Errors
    ///
    /// Propagates scan failures, including cancellation.
    pub async fn discover_with_progress(
        &self,
        roots: &[PathBuf],
        refresh: bool,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<ProjectServerRecord>> {
        let options =
            ScanOptions { refresh, global_names: self.global_names(), ..ScanOptions::default() };
        self.discovery.scan_with_progress(roots, &options, progress).await
    }

    fn global_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.store.names().map(str::to_string).collect();
        for spec in self.registry.specs() {
            match sync::load_client_view(spec) {
                Ok((view, _)) => names.extend(view.servers.keys().cloned()),
                Err(e) => tracing::warn!("ignoring {} for duplicate detection: {e:#}", spec.kind),
            }
        }
        names
    }

    /// Discovers project servers under `roots` and consolidates them into
    /// the store, honoring `dry_run`.
    ///
    /// The scan always bypasses the discovery cache so the plan reflects
    /// the current state of the project files.
    ///
    /// # Errors
    ///
    /// Propagates scan failures, rename exhaustion, and store save
    /// failures. A dry run can only fail during the scan or planning.
    pub async fn consolidate(
        &mut self,
        roots: &[PathBuf],
        strategy: &SyncStrategy,
        dry_run: bool,
    ) -> Result<ConsolidationReport> {
        let records = self.discover(roots, true).await?;
        consolidate::consolidate_all(&records, &mut self.store, strategy, dry_run)
    }
}
