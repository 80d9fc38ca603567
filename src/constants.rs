//! Global constants used throughout the MCPSYNC codebase.
//!
//! This module contains cache lifetimes, scan limits, well-known file names,
//! and environment variable names that are used across multiple modules.
//! Defining them centrally improves maintainability and makes magic numbers
//! more discoverable.

use std::time::Duration;

/// Time-to-live for cached project discovery results (5 minutes).
///
/// A repeated scan of the same root set within this window returns the
/// cached records instead of walking the filesystem again. Explicit
/// refresh bypasses the cache regardless of age.
pub const DISCOVERY_CACHE_TTL: Duration = Duration::from_secs(300);

/// Time-to-live for cached client CLI availability probes (60 seconds).
///
/// Probing for installed client binaries shells out to the PATH search;
/// the result rarely changes within a session, so it is cached briefly.
pub const AVAILABILITY_CACHE_TTL: Duration = Duration::from_secs(60);

/// How long a scan request waits on another in-flight scan of the same
/// roots before giving up and walking itself.
pub const DISCOVERY_PENDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum directory depth for project discovery scans.
///
/// Six levels is deep enough to reach projects nested under typical
/// workspace layouts (`~/work/org/team/repo`) while keeping scans of
/// large home directories bounded.
pub const DISCOVERY_MAX_DEPTH: usize = 6;

/// Directory names skipped during project discovery scans.
///
/// These are dependency and build-output trees that are both large and
/// guaranteed not to contain a project-level server definition file.
pub const DISCOVERY_SKIP_DIRS: &[&str] =
    &[".git", "node_modules", "target", ".venv", "venv", "dist", "build", "__pycache__"];

/// File name of a project-scoped server definition file.
pub const PROJECT_CONFIG_FILE: &str = ".mcp.json";

/// File name of the global enablement store inside the config directory.
pub const STORE_FILE: &str = "servers.json";

/// Upper bound on numeric suffixes tried when renaming a colliding server.
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Environment variable overriding the enablement store directory.
///
/// When set, the store lives at `$MCPSYNC_CONFIG_DIR/servers.json` instead
/// of the platform config directory. Used for test isolation.
pub const ENV_CONFIG_DIR: &str = "MCPSYNC_CONFIG_DIR";

/// Environment variable overriding the home directory used to locate
/// client configuration files. Used for test isolation.
pub const ENV_HOME: &str = "MCPSYNC_HOME";

/// Environment variable that disables progress bars when set.
pub const ENV_NO_PROGRESS: &str = "MCPSYNC_NO_PROGRESS";

/// Timestamp format used in backup file suffixes (UTC, filesystem-safe).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
