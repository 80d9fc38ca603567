//! Promotion of project-scoped servers into the global store.
//!
//! Discovery surfaces servers that live in individual projects' `.mcp.json`
//! files. Consolidation moves them into the global enablement store so every
//! client can use them. The awkward part is collisions: a project server may
//! share its name with a global one, or with a server from another project,
//! and the two definitions may differ.
//!
//! All collision handling goes through a [`ConsolidationPlan`] built before
//! anything is touched. The plan lists one action per discovered record:
//!
//! - `Promote`: new name, becomes a global entry.
//! - `Replace`: the project copy overwrites the differing global one
//!   (chosen by the keep-client and merge strategies).
//! - `Rename`: the project copy is promoted under `<name>-<project folder>`
//!   (with a numeric suffix if that is taken too).
//! - `Skip`: identical copies, or a differing one under the skip strategy.
//!
//! Plans are deterministic: records are processed in (name, project path)
//! order and rename suffixes are derived, never random, so the same inputs
//! always produce the same plan. A dry run returns the plan with zero
//! mutations. The mutating pass backs up the store file, applies the whole
//! plan in memory, and persists it with a single atomic save, so a crash
//! can only leave the old store or the new one, never half of each.

use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::PathBuf;

use crate::adapters::adapter_for;
use crate::constants::{MAX_RENAME_ATTEMPTS, PROJECT_CONFIG_FILE};
use crate::core::McpSyncError;
use crate::discovery::ProjectServerRecord;
use crate::server::{ClientKind, ClientRegistry, ConfigFormat, ServerRecord};
use crate::store::EnablementStore;
use crate::sync::SyncStrategy;
use crate::utils::{atomic_write, read_text_file, timestamped_backup};

/// What consolidation will do with one discovered record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlannedAction {
    /// Becomes a new global entry
    Promote,
    /// Overwrites the differing global entry of the same name
    Replace,
    /// Promoted under a new, non-colliding name
    Rename { to: String },
    /// Left where it is
    Skip { reason: String },
}

/// One discovered record and its planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub name: String,
    pub project_path: PathBuf,
    pub action: PlannedAction,
}

/// Action counts for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub promoted: usize,
    pub replaced: usize,
    pub renamed: usize,
    pub skipped: usize,
}

/// Complete list of actions, in (name, project path) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationPlan {
    pub entries: Vec<PlanEntry>,
}

impl ConsolidationPlan {
    /// Tallies the plan's actions.
    #[must_use]
    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();
        for entry in &self.entries {
            match &entry.action {
                PlannedAction::Promote => counts.promoted += 1,
                PlannedAction::Replace => counts.replaced += 1,
                PlannedAction::Rename { .. } => counts.renamed += 1,
                PlannedAction::Skip { .. } => counts.skipped += 1,
            }
        }
        counts
    }

    /// Whether applying the plan would change the store at all.
    #[must_use]
    pub fn has_mutations(&self) -> bool {
        self.entries.iter().any(|e| !matches!(e.action, PlannedAction::Skip { .. }))
    }
}

/// Result of [`consolidate_all`]: the plan, whether it was persisted, and
/// the store backup written before mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    pub plan: ConsolidationPlan,
    pub applied: bool,
    pub backup: Option<PathBuf>,
}

/// Result of promoting a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoteOutcome {
    /// Name the server holds in the global store
    pub name: String,
    /// Whether the project file was rewritten without it
    pub removed_from_project: bool,
}

/// Occupant of a name once the plan is applied: the record that will hold
/// it, or `None` for an existing entry whose config cannot be interpreted
/// (treated as never-equal, so collisions still resolve).
type PlannedNames = BTreeMap<String, Option<ServerRecord>>;

fn sanitize_slug(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

/// Where a colliding record ends up under the rename strategy.
enum RenameOutcome {
    /// Promote under this unused name
    Fresh(String),
    /// A candidate name already holds an identical copy; an earlier run
    /// consolidated this record
    AlreadyConsolidated,
}

fn rename_target(record: &ProjectServerRecord, taken: &PlannedNames) -> Result<RenameOutcome> {
    let folder = record.project_path.file_name().and_then(OsStr::to_str).unwrap_or("project");
    let slug = sanitize_slug(folder);
    let base = format!("{}-{slug}", record.name);

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = if n == 1 { base.clone() } else { format!("{base}-{n}") };
        match taken.get(&candidate) {
            None => return Ok(RenameOutcome::Fresh(candidate)),
            Some(Some(occupant)) if occupant.transport == record.config.transport => {
                return Ok(RenameOutcome::AlreadyConsolidated);
            }
            Some(_) => {}
        }
    }
    Err(McpSyncError::RenameExhausted { name: record.name.clone() }.into())
}

/// Builds the consolidation plan without touching anything.
///
/// Records are processed in (name, project path) order; when several
/// projects define the same new name, the lexicographically first project
/// promotes it and the rest collide. Collisions against existing store
/// entries and against earlier plan entries are handled identically.
///
/// # Errors
///
/// Fails only when the rename strategy runs out of suffixes for a name.
pub fn build_plan(
    discovered: &[ProjectServerRecord],
    store: &EnablementStore,
    strategy: &SyncStrategy,
) -> Result<ConsolidationPlan> {
    let mut ordered: Vec<&ProjectServerRecord> = discovered.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.project_path.cmp(&b.project_path)));

    let mut taken: PlannedNames = store
        .entries()
        .iter()
        .map(|(name, entry)| {
            (name.clone(), ServerRecord::from_raw(name.clone(), entry.config.clone()).ok())
        })
        .collect();

    let mut entries = Vec::with_capacity(ordered.len());
    for record in ordered {
        let action = match taken.get(&record.name) {
            None => {
                taken.insert(record.name.clone(), Some(record.config.clone()));
                PlannedAction::Promote
            }
            Some(Some(occupant)) if occupant.transport == record.config.transport => {
                PlannedAction::Skip { reason: "already consolidated".to_string() }
            }
            Some(_) => match strategy {
                SyncStrategy::Skip => {
                    PlannedAction::Skip { reason: "a different server already uses this name".to_string() }
                }
                SyncStrategy::KeepClient(_) | SyncStrategy::Merge => {
                    taken.insert(record.name.clone(), Some(record.config.clone()));
                    PlannedAction::Replace
                }
                SyncStrategy::Rename => match rename_target(record, &taken)? {
                    RenameOutcome::Fresh(to) => {
                        taken.insert(to.clone(), Some(record.config.clone()));
                        PlannedAction::Rename { to }
                    }
                    RenameOutcome::AlreadyConsolidated => {
                        PlannedAction::Skip { reason: "already consolidated".to_string() }
                    }
                },
            },
        };
        entries.push(PlanEntry {
            name: record.name.clone(),
            project_path: record.project_path.clone(),
            action,
        });
    }

    Ok(ConsolidationPlan { entries })
}

/// Plans and, unless `dry_run`, applies consolidation of the discovered
/// records into the store.
///
/// The mutating pass writes a timestamped backup of the store file, applies
/// every plan entry to the in-memory store, and persists once. Promoted and
/// renamed entries start enabled for every client; replaced entries keep
/// their existing per-client state.
///
/// # Errors
///
/// Fails on rename exhaustion, on backup failure, or if the store changed
/// on disk since it was loaded. On failure nothing has been persisted.
pub fn consolidate_all(
    discovered: &[ProjectServerRecord],
    store: &mut EnablementStore,
    strategy: &SyncStrategy,
    dry_run: bool,
) -> Result<ConsolidationReport> {
    let plan = build_plan(discovered, store, strategy)?;

    if dry_run || !plan.has_mutations() {
        tracing::debug!("consolidation plan not applied (dry_run={dry_run})");
        return Ok(ConsolidationReport { plan, applied: false, backup: None });
    }

    let backup = timestamped_backup(store.path())?;

    let by_key: BTreeMap<(&String, &PathBuf), &ProjectServerRecord> =
        discovered.iter().map(|r| ((&r.name, &r.project_path), r)).collect();
    for entry in &plan.entries {
        let Some(record) = by_key.get(&(&entry.name, &entry.project_path)) else { continue };
        match &entry.action {
            PlannedAction::Promote | PlannedAction::Replace => {
                store.upsert(&entry.name, record.config.to_raw());
            }
            PlannedAction::Rename { to } => {
                store.upsert(to, record.config.to_raw());
            }
            PlannedAction::Skip { .. } => {}
        }
    }

    store.save()?;
    let counts = plan.counts();
    tracing::info!(
        "consolidated project servers: {} promoted, {} replaced, {} renamed, {} skipped",
        counts.promoted,
        counts.replaced,
        counts.renamed,
        counts.skipped
    );

    Ok(ConsolidationReport { plan, applied: true, backup })
}

/// Promotes one discovered record into the global store.
///
/// The entry is enabled exactly for `target_clients`; every other
/// registered client is recorded as disabled. With `remove_from_project`
/// the project's definition file is rewritten without the server (backed
/// up first, other content preserved).
///
/// # Errors
///
/// Fails if the store cannot be saved or the project file cannot be
/// rewritten. The store is saved before the project file is touched, so a
/// rewrite failure never loses the definition.
pub fn promote(
    record: &ProjectServerRecord,
    store: &mut EnablementStore,
    registry: &ClientRegistry,
    target_clients: &BTreeSet<ClientKind>,
    remove_from_project: bool,
) -> Result<PromoteOutcome> {
    store.upsert(&record.name, record.config.to_raw());
    for kind in registry.kinds() {
        store.set_enabled(&record.name, kind, target_clients.contains(kind))?;
    }

    timestamped_backup(store.path())?;
    store.save()?;
    tracing::info!("promoted '{}' from {}", record.name, record.project_path.display());

    let mut removed = false;
    if remove_from_project {
        removed = remove_from_project_file(record)?;
    }

    Ok(PromoteOutcome { name: record.name.clone(), removed_from_project: removed })
}

fn remove_from_project_file(record: &ProjectServerRecord) -> Result<bool> {
    let path = record.project_path.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        tracing::warn!("project file {} vanished, nothing to remove", path.display());
        return Ok(false);
    }

    let adapter = adapter_for(ConfigFormat::Json);
    let content = read_text_file(&path)?;
    let remaining: Vec<ServerRecord> =
        adapter.parse(&content)?.into_iter().filter(|r| r.name != record.name).collect();

    let rewritten = adapter.serialize(&remaining, Some(&content))?;
    timestamped_backup(&path)?;
    atomic_write(&path, rewritten.as_bytes())?;
    tracing::debug!("removed '{}' from {}", record.name, path.display());
    Ok(true)
}
