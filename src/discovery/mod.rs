//! Discovery of project-scoped server definition files.
//!
//! Projects can carry their own `.mcp.json` next to their sources, shadowing
//! the global configuration while working inside that tree. The discovery
//! service walks a set of root directories looking for those files, parses
//! them through the JSON adapter, and reports every server it finds as a
//! [`ProjectServerRecord`] tagged with its project directory.
//!
//! Scanning a large home directory is slow, so results are cached per root
//! set with a TTL and the walk itself runs on a blocking worker task. Two
//! callers asking for the same roots at the same time share one walk: the
//! second request parks on the in-flight scan and picks up its result
//! instead of starting a duplicate traversal.
//!
//! Discovery never writes to project files. Records are rebuilt on each
//! scan and carry a `discovered_at` timestamp; nothing here is persisted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use walkdir::WalkDir;

use crate::adapters::adapter_for;
use crate::constants::{
    DISCOVERY_CACHE_TTL, DISCOVERY_MAX_DEPTH, DISCOVERY_PENDING_TIMEOUT, DISCOVERY_SKIP_DIRS,
    PROJECT_CONFIG_FILE,
};
use crate::core::McpSyncError;
use crate::server::{ConfigFormat, ServerRecord};
use crate::utils::{normalize_path, read_text_file};

/// One server definition found in a project's `.mcp.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectServerRecord {
    /// Server name as written in the project file
    pub name: String,
    /// Directory containing the definition file
    pub project_path: PathBuf,
    /// The parsed definition
    pub config: ServerRecord,
    /// Whether the name also appears in another project or in the global
    /// store
    pub is_duplicate: bool,
    /// When the scan found it
    pub discovered_at: DateTime<Utc>,
}

/// Snapshot of a scan's progress, delivered through the progress callback
/// after each directory.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Directories visited so far
    pub scanned_dirs: usize,
    /// Definition files found so far
    pub found_files: usize,
    /// Directory currently being walked
    pub current: PathBuf,
}

/// Callback invoked with [`ScanProgress`] snapshots during a scan.
pub type ProgressFn = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Knobs for one scan request.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory depth limit below each root
    pub max_depth: usize,
    /// Bypass the cache even if a fresh result exists
    pub refresh: bool,
    /// Names present in the global store, marked duplicate when a project
    /// defines them too
    pub global_names: BTreeSet<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { max_depth: DISCOVERY_MAX_DEPTH, refresh: false, global_names: BTreeSet::new() }
    }
}

/// State of one root set in the scan cache.
///
/// `Pending` holds the handle later requests wait on; `Ready` holds the
/// finished records with their completion time for TTL checks.
enum ScanState {
    Pending(Arc<Notify>),
    Ready { records: Vec<ProjectServerRecord>, completed_at: Instant },
}

/// Pulls the `Notify` handle out of a `Pending` slot so waiters can be
/// woken after the slot is replaced or removed.
fn extract_notify(scans: &DashMap<String, ScanState>, key: &str) -> Option<Arc<Notify>> {
    scans.get(key).and_then(|entry| match entry.value() {
        ScanState::Pending(notify) => Some(notify.clone()),
        ScanState::Ready { .. } => None,
    })
}

/// Caching, coalescing scanner for project-scoped definition files.
///
/// Construct one per process and share it by reference; the cache and the
/// in-flight bookkeeping live inside.
pub struct DiscoveryService {
    scans: DashMap<String, ScanState>,
    cancelled: Arc<AtomicBool>,
    ttl: Duration,
}

impl Default for DiscoveryService {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryService {
    /// Creates a service with the default cache TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DISCOVERY_CACHE_TTL)
    }

    /// Creates a service with an explicit cache TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { scans: DashMap::new(), cancelled: Arc::new(AtomicBool::new(false)), ttl }
    }

    /// Requests cancellation of the in-flight scan.
    ///
    /// The walker checks the flag between directories, so cancellation
    /// lands within one directory's worth of work. The flag is sticky:
    /// call [`DiscoveryService::clear_cancellation`] before scanning
    /// again.
    pub fn cancel(&self) {
        tracing::debug!("discovery scan cancellation requested");
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Clears a previous cancellation request.
    pub fn clear_cancellation(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }

    /// Drops all cached scan results.
    pub fn invalidate(&self) {
        self.scans.retain(|_, state| matches!(state, ScanState::Pending(_)));
    }

    /// Scans the given roots for project server definitions.
    ///
    /// Results come from the cache when a scan of the same normalized root
    /// set finished within the TTL and `refresh` was not requested. A scan
    /// already in flight for the roots is joined, not duplicated.
    ///
    /// # Errors
    ///
    /// Fails if the scan was cancelled or the worker task died. Unreadable
    /// directories and malformed project files are logged and skipped, not
    /// errors.
    pub async fn scan(
        &self,
        roots: &[PathBuf],
        options: &ScanOptions,
    ) -> Result<Vec<ProjectServerRecord>> {
        self.scan_with_progress(roots, options, None).await
    }

    /// [`DiscoveryService::scan`] with a progress callback for interactive
    /// callers. The callback runs on the walker thread after each
    /// directory.
    pub async fn scan_with_progress(
        &self,
        roots: &[PathBuf],
        options: &ScanOptions,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<ProjectServerRecord>> {
        let normalized = normalize_roots(roots);
        let key = cache_key(&normalized);
        let notify = Arc::new(Notify::new());

        loop {
            match self.scans.entry(key.clone()) {
                Entry::Occupied(entry) => match entry.get() {
                    ScanState::Ready { records, completed_at }
                        if !options.refresh && completed_at.elapsed() < self.ttl =>
                    {
                        let records = records.clone();
                        drop(entry);
                        tracing::debug!("discovery cache hit for {} root(s)", normalized.len());
                        return Ok(records);
                    }
                    ScanState::Ready { .. } => {
                        // Expired or refresh requested: take over the slot
                        drop(entry);
                        self.scans.insert(key.clone(), ScanState::Pending(notify.clone()));
                        break;
                    }
                    ScanState::Pending(existing) => {
                        let existing = existing.clone();
                        // The notified future must exist before the entry
                        // guard drops: Notify only wakes futures already
                        // waiting, and the scan may finish in between
                        let notified = existing.notified();
                        drop(entry);
                        tracing::debug!("joining in-flight scan for the same roots");
                        tokio::select! {
                            () = notified => continue,
                            () = tokio::time::sleep(DISCOVERY_PENDING_TIMEOUT) => {
                                tracing::warn!(
                                    "timed out waiting for in-flight scan, walking anyway"
                                );
                                break;
                            }
                        }
                    }
                },
                Entry::Vacant(entry) => {
                    entry.insert(ScanState::Pending(notify.clone()));
                    break;
                }
            }
        }

        // This request owns the walk now; waiters are parked on the
        // Pending slot until it resolves.
        let result = self.run_walk(normalized, options, progress).await;

        match result {
            Ok(records) => {
                let waiters = extract_notify(&self.scans, &key);
                self.scans.insert(
                    key,
                    ScanState::Ready { records: records.clone(), completed_at: Instant::now() },
                );
                if let Some(n) = waiters {
                    n.notify_waiters();
                }
                Ok(records)
            }
            Err(e) => {
                // Remove the slot so a woken waiter retries from scratch
                let waiters = extract_notify(&self.scans, &key);
                self.scans.remove(&key);
                if let Some(n) = waiters {
                    n.notify_waiters();
                }
                Err(e)
            }
        }
    }

    async fn run_walk(
        &self,
        roots: Vec<PathBuf>,
        options: &ScanOptions,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<ProjectServerRecord>> {
        let cancelled = Arc::clone(&self.cancelled);
        let max_depth = options.max_depth;
        let global_names = options.global_names.clone();

        tokio::task::spawn_blocking(move || {
            let mut records = walk_roots(&roots, max_depth, &cancelled, progress.as_deref())?;
            records.sort_by(|a, b| {
                a.name.cmp(&b.name).then_with(|| a.project_path.cmp(&b.project_path))
            });
            mark_duplicates(&mut records, &global_names);
            Ok(records)
        })
        .await
        .context("discovery worker failed")?
    }
}

/// Normalizes, sorts, and dedupes the requested roots so equivalent
/// requests share one cache slot.
fn normalize_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut normalized: Vec<PathBuf> = roots.iter().map(|r| normalize_path(r)).collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn cache_key(normalized: &[PathBuf]) -> String {
    let parts: Vec<String> = normalized.iter().map(|p| p.display().to_string()).collect();
    parts.join("|")
}

fn keep_entry(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return true;
    }
    let name = entry.file_name().to_str().unwrap_or("");
    !DISCOVERY_SKIP_DIRS.contains(&name)
}

fn walk_roots(
    roots: &[PathBuf],
    max_depth: usize,
    cancelled: &AtomicBool,
    progress: Option<&(dyn Fn(ScanProgress) + Send + Sync)>,
) -> Result<Vec<ProjectServerRecord>> {
    let mut records = Vec::new();
    let mut scanned_dirs = 0;
    let mut found_files = 0;

    for root in roots {
        if !root.exists() {
            tracing::debug!("skipping absent scan root {}", root.display());
            continue;
        }

        let walker =
            WalkDir::new(root).max_depth(max_depth).follow_links(false).into_iter().filter_entry(keep_entry);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable path during scan: {e}");
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if cancelled.load(Ordering::Relaxed) {
                    return Err(McpSyncError::Other { message: "scan cancelled".to_string() }.into());
                }
                scanned_dirs += 1;
                if let Some(callback) = progress {
                    callback(ScanProgress {
                        scanned_dirs,
                        found_files,
                        current: entry.path().to_path_buf(),
                    });
                }
                continue;
            }

            if entry.file_name() == PROJECT_CONFIG_FILE {
                found_files += 1;
                match parse_project_file(entry.path()) {
                    Ok(mut found) => records.append(&mut found),
                    Err(e) => {
                        // One bad project must not abort the whole scan
                        tracing::warn!(
                            "skipping malformed project file {}: {e:#}",
                            entry.path().display()
                        );
                    }
                }
            }
        }
    }

    Ok(records)
}

fn parse_project_file(path: &Path) -> Result<Vec<ProjectServerRecord>> {
    let content = read_text_file(path)?;
    let parsed = adapter_for(ConfigFormat::Json).parse(&content)?;
    let project_path = path.parent().map_or_else(|| path.to_path_buf(), Path::to_path_buf);
    let discovered_at = Utc::now();

    Ok(parsed
        .into_iter()
        .map(|config| ProjectServerRecord {
            name: config.name.clone(),
            project_path: project_path.clone(),
            config,
            is_duplicate: false,
            discovered_at,
        })
        .collect())
}

/// Marks every record whose name appears under more than one project path,
/// or in the global store, as a duplicate.
fn mark_duplicates(records: &mut [ProjectServerRecord], global_names: &BTreeSet<String>) {
    let mut paths_by_name: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();
    for record in records.iter() {
        paths_by_name
            .entry(record.name.clone())
            .or_default()
            .insert(record.project_path.clone());
    }

    for record in records.iter_mut() {
        let in_multiple_projects =
            paths_by_name.get(&record.name).is_some_and(|paths| paths.len() > 1);
        record.is_duplicate = in_multiple_projects || global_names.contains(&record.name);
    }
}
