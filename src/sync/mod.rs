//! Reconciliation of server definitions across client configurations.
//!
//! Each client keeps its own copy of every server it knows about, and the
//! copies drift: a server edited in one client's file, added in another,
//! removed from a third. The sync engine reads every client's view, computes
//! one agreed copy per server name under a chosen [`SyncStrategy`], and
//! writes the agreement back through the format adapters.
//!
//! # Strategies
//!
//! - [`SyncStrategy::Skip`] leaves differing copies exactly as they are.
//! - [`SyncStrategy::KeepClient`] makes every client adopt one client's copy.
//! - [`SyncStrategy::Merge`] takes the transport block wholesale from the
//!   most recently modified copy and unions `env`/`headers` keys across
//!   copies of the same variant, last write winning per key.
//! - [`SyncStrategy::Rename`] only has meaning during consolidation, where
//!   colliding names get a deterministic suffix; within reconciliation it
//!   behaves as `Skip`.
//!
//! Recency comes from each source file's modification time. When two copies
//! tie (equal mtimes, or neither known), the client that appears earlier in
//! the registry wins. The rule is deterministic: the same views and strategy
//! always reconcile to the same result.
//!
//! # Partial Success
//!
//! One client's unreadable file or unrepresentable record never blocks the
//! others. Failures are collected per client in the [`SyncReport`] and the
//! remaining clients proceed; nothing is ever dropped silently.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::adapters::adapter_for;
use crate::core::McpSyncError;
use crate::server::{ClientKind, ClientRegistry, ClientSpec, ServerRecord, TransportKind};
use crate::store::EnablementStore;
use crate::utils::{
    FileFingerprint, atomic_write, get_modified_time, read_text_file, timestamped_backup,
};

/// How divergent copies of the same server are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Leave each client's existing copy untouched.
    Skip,
    /// Every client adopts the named client's copy.
    KeepClient(ClientKind),
    /// Most recently modified transport wins; `env`/`headers` keys are
    /// unioned, last write winning per key.
    Merge,
    /// Collisions get a deterministic new name instead of being merged.
    /// Only meaningful during consolidation; reconciliation treats it
    /// as [`SyncStrategy::Skip`].
    Rename,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::KeepClient(client) => write!(f, "keep:{client}"),
            Self::Merge => write!(f, "merge"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

impl FromStr for SyncStrategy {
    type Err = McpSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if let Some(client) = lower.strip_prefix("keep:") {
            if client.is_empty() {
                return Err(McpSyncError::Other {
                    message: "keep strategy needs a client, e.g. keep:claude".to_string(),
                });
            }
            return Ok(Self::KeepClient(ClientKind::new(client)));
        }
        match lower.as_str() {
            "skip" => Ok(Self::Skip),
            "merge" => Ok(Self::Merge),
            "rename" => Ok(Self::Rename),
            _ => Err(McpSyncError::Other {
                message: format!(
                    "unknown sync strategy '{s}' (expected skip, merge, rename, or keep:<client>)"
                ),
            }),
        }
    }
}

/// One client's parsed servers plus the source file's modification time.
///
/// The mtime drives the merge strategy's recency decisions; `None` means
/// the client has no file yet (or the time could not be read) and loses
/// recency comparisons against any known time.
#[derive(Debug, Clone, Default)]
pub struct ClientView {
    /// Servers keyed by name
    pub servers: BTreeMap<String, ServerRecord>,
    /// When the source file was last modified
    pub modified_at: Option<DateTime<Utc>>,
}

/// What happened to one server in one client's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Added,
    Updated,
    Removed,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Updated => write!(f, "updated"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// One applied change to one client's configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncChange {
    pub client: ClientKind,
    pub server: String,
    pub action: SyncAction,
}

/// A server left untouched, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSkip {
    pub server: String,
    pub reason: String,
}

/// A per-client failure. `server` is `None` when the whole file failed
/// (unreadable, stale, or unwritable) rather than one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub client: ClientKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub reason: String,
}

/// Everything a sync run did, skipped, and failed to do.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub changed: Vec<SyncChange>,
    pub skipped: Vec<SyncSkip>,
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    /// Whether any client failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Whether no file needed touching.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }

    /// One-line count summary for log and CLI output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} changed, {} skipped, {} failed",
            self.changed.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Result of a reconciliation pass: the map each client should hold, plus
/// the skips and per-record failures encountered along the way.
///
/// A client missing from `clients` had a record its format cannot
/// represent; its write is withheld entirely and the reason is in the
/// report.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub clients: BTreeMap<ClientKind, BTreeMap<String, ServerRecord>>,
    pub report: SyncReport,
}

/// One client's copy of a contested name during reconciliation.
struct ServerCopy<'a> {
    kind: &'a ClientKind,
    record: &'a ServerRecord,
    modified_at: Option<DateTime<Utc>>,
    registry_idx: usize,
}

/// Recency ordering: newer mtime wins, unknown loses to known, ties go to
/// the earlier registry entry.
fn recency(copy: &ServerCopy<'_>) -> (Option<DateTime<Utc>>, Reverse<usize>) {
    (copy.modified_at, Reverse(copy.registry_idx))
}

/// Computes the agreed per-client server maps for a set of views.
///
/// Pure with respect to the filesystem: views go in, target maps come
/// out. Names present in exactly one view propagate to every client;
/// names with differing copies are resolved per the strategy. Each
/// client's result is checked against its format before the outcome is
/// final.
#[must_use]
pub fn reconcile(
    views: &BTreeMap<ClientKind, ClientView>,
    strategy: &SyncStrategy,
    registry: &ClientRegistry,
) -> SyncOutcome {
    let mut report = SyncReport::default();
    let mut clients: BTreeMap<ClientKind, BTreeMap<String, ServerRecord>> =
        views.keys().map(|kind| (kind.clone(), BTreeMap::new())).collect();

    let names: BTreeSet<&String> = views.values().flat_map(|v| v.servers.keys()).collect();

    for name in names {
        let copies: Vec<ServerCopy<'_>> = views
            .iter()
            .filter_map(|(kind, view)| {
                view.servers.get(name).map(|record| ServerCopy {
                    kind,
                    record,
                    modified_at: view.modified_at,
                    registry_idx: registry.index_of(kind).unwrap_or(usize::MAX),
                })
            })
            .collect();
        let [first, rest @ ..] = copies.as_slice() else { continue };

        let agreed = if rest.iter().all(|c| c.record == first.record) {
            // One copy, or several identical ones: propagate everywhere
            Some(first.record.clone())
        } else {
            match strategy {
                SyncStrategy::Skip | SyncStrategy::Rename => {
                    report.skipped.push(SyncSkip {
                        server: name.clone(),
                        reason: "copies differ; strategy leaves them in place".to_string(),
                    });
                    None
                }
                SyncStrategy::KeepClient(keep) => {
                    if let Some(kept) = copies.iter().find(|c| c.kind == keep) {
                        Some(kept.record.clone())
                    } else {
                        report.skipped.push(SyncSkip {
                            server: name.clone(),
                            reason: format!("client '{keep}' has no copy to keep"),
                        });
                        None
                    }
                }
                SyncStrategy::Merge => Some(merge_copies(first, rest)),
            }
        };

        match agreed {
            Some(record) => {
                for map in clients.values_mut() {
                    map.insert(name.clone(), record.clone());
                }
            }
            None => {
                // Unresolved: every holder keeps what it has
                for copy in &copies {
                    if let Some(map) = clients.get_mut(copy.kind) {
                        map.insert(name.clone(), copy.record.clone());
                    }
                }
            }
        }
    }

    // A record a client's format cannot represent withholds that client's
    // whole write rather than dropping the record from its file.
    let mut withheld = Vec::new();
    for (kind, map) in &clients {
        let Some(spec) = registry.get(kind) else { continue };
        let adapter = adapter_for(spec.format);
        let mut representable = true;
        for record in map.values() {
            if let Err(e) = adapter.check(record) {
                report.failed.push(SyncFailure {
                    client: kind.clone(),
                    server: Some(record.name.clone()),
                    reason: format!("{e:#}"),
                });
                representable = false;
            }
        }
        if !representable {
            withheld.push(kind.clone());
        }
    }
    for kind in withheld {
        clients.remove(&kind);
    }

    SyncOutcome { clients, report }
}

/// Merges divergent copies: transport wholesale from the most recent one,
/// `env`/`headers` unioned across same-variant copies in recency order so
/// the newest value wins each key.
fn merge_copies(first: &ServerCopy<'_>, rest: &[ServerCopy<'_>]) -> ServerRecord {
    let winner = rest.iter().fold(first, |best, c| {
        if recency(c) > recency(best) { c } else { best }
    });

    let mut ordered: Vec<&ServerCopy<'_>> = std::iter::once(first).chain(rest.iter()).collect();
    ordered.sort_by(|a, b| recency(a).cmp(&recency(b)));

    let transport = match &winner.record.transport {
        TransportKind::Stdio { command, args, .. } => {
            let mut env = BTreeMap::new();
            for copy in &ordered {
                if let TransportKind::Stdio { env: theirs, .. } = &copy.record.transport {
                    env.extend(theirs.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            TransportKind::Stdio { command: command.clone(), args: args.clone(), env }
        }
        TransportKind::Http { url, .. } => {
            let mut headers = BTreeMap::new();
            for copy in &ordered {
                if let TransportKind::Http { headers: theirs, .. } = &copy.record.transport {
                    headers.extend(theirs.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            TransportKind::Http { url: url.clone(), headers }
        }
    };

    ServerRecord {
        name: winner.record.name.clone(),
        transport,
        enabled: winner.record.enabled,
    }
}

/// What was read from one client's file, kept for the write-back:
/// the raw text for document-preserving serialization and the
/// fingerprint for stale-write detection.
pub(crate) struct SourceFile {
    content: Option<String>,
    fingerprint: Option<FileFingerprint>,
}

pub(crate) fn load_client_view(spec: &ClientSpec) -> Result<(ClientView, SourceFile)> {
    let path = &spec.config_path;
    if !path.exists() {
        return Ok((ClientView::default(), SourceFile { content: None, fingerprint: None }));
    }

    let content = read_text_file(path)?;
    let fingerprint = FileFingerprint::capture(path)?;
    let modified_at = Some(DateTime::<Utc>::from(get_modified_time(path)?));
    let records = adapter_for(spec.format)
        .parse(&content)
        .with_context(|| format!("cannot read {} servers from {}", spec.display_name, path.display()))?;
    let servers = records.into_iter().map(|r| (r.name.clone(), r)).collect();

    Ok((ClientView { servers, modified_at }, SourceFile { content: Some(content), fingerprint }))
}

pub(crate) fn write_client_file(
    spec: &ClientSpec,
    servers: &BTreeMap<String, ServerRecord>,
    source: &SourceFile,
) -> Result<()> {
    let path = &spec.config_path;
    let records: Vec<ServerRecord> = servers.values().cloned().collect();
    let serialized = adapter_for(spec.format).serialize(&records, source.content.as_deref())?;

    if !FileFingerprint::verify(source.fingerprint.as_ref(), path)? {
        return Err(McpSyncError::StaleWrite { path: path.display().to_string() }.into());
    }
    timestamped_backup(path)?;
    atomic_write(path, serialized.as_bytes())?;

    tracing::info!("updated {} servers in {}", spec.display_name, path.display());
    Ok(())
}

fn diff_into_report(
    client: &ClientKind,
    before: &BTreeMap<String, ServerRecord>,
    after: &BTreeMap<String, ServerRecord>,
    report: &mut SyncReport,
) {
    for (name, record) in after {
        match before.get(name) {
            None => report.changed.push(SyncChange {
                client: client.clone(),
                server: name.clone(),
                action: SyncAction::Added,
            }),
            Some(old) if old != record => report.changed.push(SyncChange {
                client: client.clone(),
                server: name.clone(),
                action: SyncAction::Updated,
            }),
            Some(_) => {}
        }
    }
    for name in before.keys() {
        if !after.contains_key(name) {
            report.changed.push(SyncChange {
                client: client.clone(),
                server: name.clone(),
                action: SyncAction::Removed,
            });
        }
    }
}

/// Reads every registered client's file, reconciles, and writes the
/// agreement back.
///
/// Servers the store marks disabled for a client are withheld from that
/// client's file (their configuration stays in the store). Files that
/// already agree are not rewritten, so a second run right after a
/// successful one changes nothing. Every rewritten file gets a
/// timestamped backup first and is refused if it changed on disk since
/// it was read.
///
/// # Errors
///
/// Per-client problems (unreadable file, stale write, unrepresentable
/// record) land in the report's `failed` list rather than aborting the
/// run; an error return means sync could not start at all.
pub fn sync_clients(
    registry: &ClientRegistry,
    store: &EnablementStore,
    strategy: &SyncStrategy,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mut views: BTreeMap<ClientKind, ClientView> = BTreeMap::new();
    let mut sources: BTreeMap<ClientKind, SourceFile> = BTreeMap::new();

    for spec in registry.specs() {
        match load_client_view(spec) {
            Ok((view, source)) => {
                views.insert(spec.kind.clone(), view);
                sources.insert(spec.kind.clone(), source);
            }
            Err(e) => {
                tracing::warn!("excluding {} from sync: {e:#}", spec.kind);
                report.failed.push(SyncFailure {
                    client: spec.kind.clone(),
                    server: None,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    let outcome = reconcile(&views, strategy, registry);
    report.skipped.extend(outcome.report.skipped);
    report.failed.extend(outcome.report.failed);
    let mut clients = outcome.clients;

    for spec in registry.specs() {
        let Some(mut target) = clients.remove(&spec.kind) else { continue };
        let (Some(view), Some(source)) = (views.get(&spec.kind), sources.get(&spec.kind)) else {
            continue;
        };

        target.retain(|name, _| {
            let enabled = store.is_enabled(name, &spec.kind);
            if !enabled {
                tracing::debug!("withholding '{name}' from {}: disabled", spec.kind);
            }
            enabled
        });

        if target == view.servers {
            tracing::debug!("{} already agrees, nothing to write", spec.kind);
            continue;
        }

        if let Err(e) = write_client_file(spec, &target, source) {
            report.failed.push(SyncFailure {
                client: spec.kind.clone(),
                server: None,
                reason: format!("{e:#}"),
            });
            continue;
        }
        diff_into_report(&spec.kind, &view.servers, &target, &mut report);
    }

    Ok(report)
}
