//! File system utilities with atomic write guarantees.
//!
//! Every mutation of a configuration file in this crate goes through
//! [`atomic_write`], which uses a write-then-rename strategy so that a crash
//! or concurrent reader never observes a partially written document. The
//! module also provides timestamped sibling backups and file fingerprints
//! used for stale-write detection.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Ensures a directory exists, creating it and all parent directories if needed.
///
/// # Arguments
///
/// * `path` - The directory path to create
///
/// # Returns
///
/// - `Ok(())` if the directory exists or was successfully created
/// - `Err` if the path exists but is not a directory, or creation fails
///
/// # Examples
///
/// ```rust,no_run
/// use mcpsync_cli::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("output/backups"))?;
/// # Ok(())
/// # }
/// ```
///
/// # Platform Notes
///
/// - **Windows**: Automatically handles long paths (>260 characters)
/// - **Unix**: Respects umask for directory permissions
pub fn ensure_dir(path: &Path) -> Result<()> {
    // Handle Windows long paths
    let safe_path = crate::utils::platform::windows_long_path(path);

    if !safe_path.exists() {
        fs::create_dir_all(&safe_path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check that the path length is < 260 chars or that long path support is enabled"
            } else {
                "Check directory permissions and path validity"
            };

            format!("Failed to create directory: {}\n\n{}", path.display(), platform_help)
        })?;
    } else if !safe_path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Safely writes a string to a file using atomic operations.
///
/// This is a convenience wrapper around [`atomic_write`] that handles
/// string-to-bytes conversion. The write is atomic, meaning the file either
/// contains the new content or the old content, never a partial write.
///
/// # See Also
///
/// - [`atomic_write`] for writing raw bytes
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// This function ensures atomic writes by:
/// 1. Writing content to a temporary file (`.tmp` extension)
/// 2. Syncing the temporary file to disk
/// 3. Atomically renaming the temporary file to the target path
///
/// This approach prevents data corruption from interrupted writes and ensures
/// readers never see partially written files.
///
/// # Arguments
///
/// * `path` - The target file path
/// * `content` - The raw bytes to write
///
/// # Examples
///
/// ```rust,no_run
/// use mcpsync_cli::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("servers.json"), br#"{"mcpServers": {}}"#)?;
/// # Ok(())
/// # }
/// ```
///
/// # Guarantees
///
/// - **Atomicity**: File contents are never in a partial state
/// - **Durability**: Content is synced to disk before rename
/// - **Safety**: Parent directories are created automatically
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    // Handle Windows long paths
    let safe_path = crate::utils::platform::windows_long_path(path);

    // Create parent directory if needed
    if let Some(parent) = safe_path.parent() {
        ensure_dir(parent)?;
    }

    // Write to temporary file first
    let temp_path = safe_path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).with_context(|| {
            let platform_help = if crate::utils::platform::is_windows() {
                "On Windows: Check file permissions, path length, and that directory exists"
            } else {
                "Check file permissions and that directory exists"
            };

            format!("Failed to create temp file: {}\n\n{}", temp_path.display(), platform_help)
        })?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    // Atomic rename
    fs::rename(&temp_path, &safe_path)
        .with_context(|| format!("Failed to rename temp file to: {}", safe_path.display()))?;

    Ok(())
}

/// Normalizes a path lexically, removing `.` components and resolving `..`
/// where possible.
///
/// Unlike `std::fs::canonicalize`, this function does not touch the file
/// system, so it works for paths that do not exist yet and never resolves
/// symlinks. Leading `..` components that cannot be resolved are preserved.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component.as_os_str());
                }
            }
            _ => result.push(component.as_os_str()),
        }
    }
    result
}

/// Reads a text file with proper error context.
///
/// # Errors
/// Returns an error with context if the file cannot be read
pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Writes a text file atomically with proper error handling.
///
/// # Errors
/// Returns an error with context if the file cannot be written
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    safe_write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Reads and parses a JSON file.
///
/// # Type Parameters
/// * `T` - The type to deserialize into (must implement `DeserializeOwned`)
///
/// # Errors
/// Returns an error if the file cannot be read or parsed
pub fn read_json_file<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = read_text_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from file: {}", path.display()))
}

/// Writes data as JSON to a file atomically.
///
/// # Arguments
/// * `path` - The path to write to
/// * `data` - The data to serialize
/// * `pretty` - Whether to use pretty formatting
///
/// # Errors
/// Returns an error if serialization fails or the file cannot be written
pub fn write_json_file<T>(path: &Path, data: &T, pretty: bool) -> Result<()>
where
    T: serde::Serialize,
{
    let json = if pretty {
        serde_json::to_string_pretty(data)?
    } else {
        serde_json::to_string(data)?
    };

    write_text_file(path, &json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))
}

/// Calculates the SHA-256 checksum of a file.
///
/// # Returns
///
/// A 64-character lowercase hexadecimal string representing the SHA-256 hash,
/// or an error if the file cannot be read
///
/// # Performance
///
/// This function reads the entire file into memory. Client configuration
/// files are small, so this is not a concern here.
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read file for checksum: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&content);
    let result = hasher.finalize();

    Ok(hex::encode(result))
}

/// Gets the modification time of a file.
///
/// # Errors
/// Returns an error if the file metadata cannot be read
pub fn get_modified_time(path: &Path) -> Result<SystemTime> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to get metadata for: {}", path.display()))?;

    metadata
        .modified()
        .with_context(|| format!("Failed to get modification time for: {}", path.display()))
}

/// Copies a file to a timestamped sibling before it is rewritten.
///
/// The backup lands next to the original as `<name>.backup-<timestamp>`,
/// where the timestamp is UTC in `YYYYmmddHHMMSS` form. If a backup with the
/// same timestamp already exists, a numeric suffix is appended.
///
/// # Returns
///
/// - `Ok(Some(path))` with the backup location if the source file exists
/// - `Ok(None)` if there is nothing to back up
///
/// # Examples
///
/// ```rust,no_run
/// use mcpsync_cli::utils::fs::timestamped_backup;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// if let Some(backup) = timestamped_backup(Path::new("servers.json"))? {
///     println!("Previous contents preserved at {}", backup.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn timestamped_backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        anyhow::anyhow!("Cannot back up a path without a file name: {}", path.display())
    })?;

    let stamp = chrono::Utc::now().format(crate::constants::BACKUP_TIMESTAMP_FORMAT).to_string();
    let mut backup = path.with_file_name(format!("{file_name}.backup-{stamp}"));

    // Same-second backups get a numeric suffix instead of clobbering
    let mut attempt = 1u32;
    while backup.exists() {
        attempt += 1;
        backup = path.with_file_name(format!("{file_name}.backup-{stamp}-{attempt}"));
    }

    fs::copy(path, &backup).with_context(|| {
        format!("Failed to back up {} to {}", path.display(), backup.display())
    })?;

    Ok(Some(backup))
}

/// Snapshot of a file's identity at read time, used to detect concurrent
/// modification before writing back.
///
/// The modification time is the fast path: if it is unchanged, the file is
/// assumed unchanged without re-reading it. When the modification time
/// differs, the SHA-256 checksum breaks the tie so that a `touch` without a
/// content change is not reported as a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    modified: Option<SystemTime>,
    checksum: String,
}

impl FileFingerprint {
    /// Captures the fingerprint of a file, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn capture(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let modified = fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for: {}", path.display()))?
            .modified()
            .ok();
        let checksum = calculate_checksum(path)?;

        Ok(Some(Self { modified, checksum }))
    }

    /// Checks whether a file still matches a fingerprint taken earlier.
    ///
    /// An `expected` of `None` means the file did not exist when it was
    /// read; the check then passes only if it still does not exist.
    ///
    /// # Errors
    /// Returns an error if the current file cannot be read.
    pub fn verify(expected: Option<&Self>, path: &Path) -> Result<bool> {
        let Some(expected) = expected else {
            return Ok(!path.exists());
        };

        if !path.exists() {
            return Ok(false);
        }

        // Fast path: unchanged mtime means unchanged content
        if let Some(known) = expected.modified
            && let Ok(metadata) = fs::metadata(path)
            && let Ok(current) = metadata.modified()
            && current == known
        {
            return Ok(true);
        }

        Ok(calculate_checksum(path)? == expected.checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let test_dir = temp.path().join("nested").join("dirs");

        assert!(!test_dir.exists());
        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.exists());
        assert!(test_dir.is_dir());

        // Idempotent on existing directories
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("not_a_dir");
        fs::write(&file, "content").unwrap();

        let result = ensure_dir(&file);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("config.json");

        atomic_write(&file, b"first").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "first");

        atomic_write(&file, b"second").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "second");

        // No temp file left behind
        assert!(!file.with_extension("tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("a").join("b").join("config.json");

        atomic_write(&file, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "{}");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/foo/./bar/../baz")), PathBuf::from("/foo/baz"));
        assert_eq!(normalize_path(Path::new("foo/bar/..")), PathBuf::from("foo"));
        assert_eq!(normalize_path(Path::new("../foo")), PathBuf::from("../foo"));
    }

    #[test]
    fn test_read_write_text_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("notes.txt");

        write_text_file(&file, "hello").unwrap();
        assert_eq!(read_text_file(&file).unwrap(), "hello");
    }

    #[test]
    fn test_read_text_file_missing() {
        let temp = tempdir().unwrap();
        let result = read_text_file(&temp.path().join("missing.txt"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read file"));
    }

    #[test]
    fn test_read_write_json_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("data.json");

        let data = serde_json::json!({"name": "context7", "enabled": true});
        write_json_file(&file, &data, true).unwrap();

        let loaded: serde_json::Value = read_json_file(&file).unwrap();
        assert_eq!(loaded, data);

        // Pretty output is indented
        let raw = fs::read_to_string(&file).unwrap();
        assert!(raw.contains('\n'));
    }

    #[test]
    fn test_calculate_checksum() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("data.bin");
        fs::write(&file, b"hello world").unwrap();

        let checksum = calculate_checksum(&file).unwrap();
        // SHA-256 of "hello world"
        assert_eq!(checksum, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[test]
    fn test_get_modified_time() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "content").unwrap();

        let mtime = get_modified_time(&file).unwrap();
        assert!(mtime <= SystemTime::now());
        assert!(get_modified_time(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_timestamped_backup() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("servers.json");
        fs::write(&file, "original").unwrap();

        let backup = timestamped_backup(&file).unwrap().unwrap();
        assert!(backup.exists());
        assert_eq!(fs::read_to_string(&backup).unwrap(), "original");

        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("servers.json.backup-"));

        // Same-second collision picks a distinct name
        let second = timestamped_backup(&file).unwrap().unwrap();
        assert_ne!(backup, second);
        assert!(second.exists());
    }

    #[test]
    fn test_timestamped_backup_missing_source() {
        let temp = tempdir().unwrap();
        let result = timestamped_backup(&temp.path().join("missing.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_fingerprint_detects_change() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("config.json");
        fs::write(&file, "original").unwrap();

        let fingerprint = FileFingerprint::capture(&file).unwrap();
        assert!(fingerprint.is_some());
        assert!(FileFingerprint::verify(fingerprint.as_ref(), &file).unwrap());

        // Coarse mtime granularity on some filesystems
        thread::sleep(Duration::from_millis(20));
        fs::write(&file, "modified by someone else").unwrap();
        assert!(!FileFingerprint::verify(fingerprint.as_ref(), &file).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_touch() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("config.json");
        fs::write(&file, "stable").unwrap();

        let fingerprint = FileFingerprint::capture(&file).unwrap();

        // Rewriting identical content changes mtime but not the checksum
        thread::sleep(Duration::from_millis(20));
        fs::write(&file, "stable").unwrap();
        assert!(FileFingerprint::verify(fingerprint.as_ref(), &file).unwrap());
    }

    #[test]
    fn test_fingerprint_absent_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("config.json");

        // Absent at capture, still absent: passes
        let fingerprint = FileFingerprint::capture(&file).unwrap();
        assert!(fingerprint.is_none());
        assert!(FileFingerprint::verify(None, &file).unwrap());

        // File appeared since capture: fails
        fs::write(&file, "created concurrently").unwrap();
        assert!(!FileFingerprint::verify(None, &file).unwrap());

        // File deleted since capture: fails
        let fingerprint = FileFingerprint::capture(&file).unwrap();
        fs::remove_file(&file).unwrap();
        assert!(!FileFingerprint::verify(fingerprint.as_ref(), &file).unwrap());
    }
}
