//! Cross-platform utilities and helpers
//!
//! This module provides utility functions for file operations, platform-specific
//! code, and user interface elements like progress bars. All utilities are designed
//! to work consistently across Windows, macOS, and Linux.
//!
//! # Modules
//!
//! - [`fs`] - File system operations with atomic writes and timestamped backups
//! - [`platform`] - Platform-specific helpers and path resolution
//! - [`progress`] - Progress bars and spinners for long-running scans
//!
//! # Cross-Platform Considerations
//!
//! All utilities handle platform differences:
//! - Path separators (`/` vs `\`)
//! - Home and configuration directory conventions
//! - Environment variable expansion syntax
//!
//! # Example
//!
//! ```rust,no_run
//! use mcpsync_cli::utils::{ensure_dir, atomic_write, timestamped_backup};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! // Ensure directory exists
//! ensure_dir(Path::new("output"))?;
//!
//! // Preserve the previous contents, then replace atomically
//! let config = Path::new("output/servers.json");
//! timestamped_backup(config)?;
//! atomic_write(config, br#"{"context7": {}}"#)?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{
    FileFingerprint, atomic_write, calculate_checksum, ensure_dir, get_modified_time,
    normalize_path, read_json_file, read_text_file, safe_write, timestamped_backup,
    write_json_file, write_text_file,
};
pub use platform::{config_dir, home_dir, resolve_path};
pub use progress::ProgressBar;
