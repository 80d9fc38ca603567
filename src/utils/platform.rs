//! Platform-specific helpers and path resolution.
//!
//! Client configuration files live in user-level locations (`~/.claude.json`,
//! `~/.gemini/settings.json`, `~/.codex/config.toml`), so almost everything in
//! this crate starts from the home directory. Both the home and configuration
//! directories can be overridden via environment variables, which is how the
//! integration tests redirect all file access into temporary directories.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::constants::{ENV_CONFIG_DIR, ENV_HOME};

/// Checks if the current platform is Windows.
///
/// This is determined at compile time.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the user's home directory.
///
/// # Resolution Order
///
/// 1. The `MCPSYNC_HOME` environment variable, if set (used by tests and
///    sandboxed environments)
/// 2. The platform home directory (`$HOME` on Unix, `%USERPROFILE%` on
///    Windows)
///
/// # Errors
///
/// Returns an error if neither source yields a home directory.
pub fn home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(ENV_HOME)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Returns the directory holding this tool's own state, including the
/// enablement store.
///
/// # Resolution Order
///
/// 1. The `MCPSYNC_CONFIG_DIR` environment variable, if set
/// 2. The platform configuration directory plus `mcpsync`
///
/// # Platform Paths
///
/// - **Linux**: `$XDG_CONFIG_HOME/mcpsync` or `$HOME/.config/mcpsync`
/// - **macOS**: `$HOME/Library/Application Support/mcpsync`
/// - **Windows**: `%APPDATA%\mcpsync`
///
/// # Errors
///
/// Returns an error if the platform configuration directory cannot be
/// determined.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    dirs::config_dir().map(|p| p.join("mcpsync")).ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the APPDATA environment variable is set"
        } else if cfg!(target_os = "macos") {
            "On macOS: Check that the HOME environment variable is set"
        } else {
            "On Linux: Check that the XDG_CONFIG_HOME or HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine configuration directory.\n\n{platform_help}")
    })
}

/// Resolves a path string with tilde and environment variable expansion.
///
/// # Supported Formats
///
/// - `~/path` - Expands to the home directory (honoring `MCPSYNC_HOME`)
/// - `$VAR/path` - Unix-style environment variable expansion
/// - `%VAR%\path` - Windows-style environment variable expansion
/// - Absolute and relative paths pass through unchanged
///
/// # Errors
///
/// - Tilde forms other than `~/` (such as `~user/path`)
/// - Undefined environment variables in the path
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = if let Some(stripped) = path.strip_prefix("~/") {
        let home = home_dir()?;
        home.join(stripped)
    } else if path.starts_with('~') {
        return Err(anyhow::anyhow!(
            "Invalid path: {path}\n\n\
            Tilde expansion only supports '~/' for the home directory.\n\
            Use '~/' followed by a relative path, like '~/.claude.json'"
        ));
    } else {
        PathBuf::from(path)
    };

    // Expand environment variables
    let path_str = expanded.to_string_lossy();

    // Handle Windows-style %VAR% expansion differently
    let expanded_str = if is_windows() && path_str.contains('%') {
        let mut result = path_str.to_string();
        if let Ok(re) = Regex::new(r"%([^%]+)%") {
            for cap in re.captures_iter(&path_str) {
                if let Some(var_name) = cap.get(1)
                    && let Ok(value) = std::env::var(var_name.as_str())
                {
                    result = result.replace(&format!("%{}%", var_name.as_str()), &value);
                }
            }
        }

        // Also handle Unix-style for compatibility
        match shellexpand::env(&result) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => result,
        }
    } else {
        // Unix-style $VAR expansion
        shellexpand::env(&path_str)
            .with_context(|| {
                format!(
                    "Failed to expand environment variables in path: {path_str}\n\n\
                    Common issues:\n\
                    - Undefined environment variable (e.g., $UNDEFINED_VAR)\n\
                    - Invalid variable syntax (use $VAR or ${{VAR}})"
                )
            })?
            .into_owned()
    };

    Ok(PathBuf::from(expanded_str))
}

/// Handles Windows long paths (>260 characters) by applying UNC prefixes.
///
/// Windows historically limited paths to 260 characters. This function
/// applies the `\\?\` prefix to paths that exceed the limit so they remain
/// accessible. Paths that are short enough or already prefixed pass through
/// unchanged.
#[cfg(windows)]
pub fn windows_long_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path_str.len() > 260 && !path_str.starts_with(r"\\?\") {
        // Convert to absolute path if relative
        let absolute_path = if path.is_relative() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(path)
        } else {
            path.to_path_buf()
        };

        let absolute_str = absolute_path.to_string_lossy();
        if absolute_str.len() > 260 {
            if let Some(stripped) = absolute_str.strip_prefix(r"\\") {
                // Network path
                PathBuf::from(format!(r"\\?\UNC\{}", stripped))
            } else {
                // Local path
                PathBuf::from(format!(r"\\?\{}", absolute_str))
            }
        } else {
            absolute_path
        }
    } else {
        path.to_path_buf()
    }
}

/// No-op implementation of [`windows_long_path`] for non-Windows platforms.
///
/// Unix-like systems have no equivalent of the Windows 260-character path
/// limitation, so the input path is returned unchanged.
#[cfg(not(windows))]
#[must_use]
pub fn windows_long_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

/// Checks whether a command is available in the system PATH.
///
/// On Windows this also consults PATHEXT, so `command_exists("claude")`
/// finds `claude.cmd` and friends. The lookup hits the filesystem; callers
/// that probe repeatedly should cache the answer.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_is_windows_matches_cfg() {
        assert_eq!(is_windows(), cfg!(windows));
    }

    #[test]
    #[serial]
    fn test_home_dir_override() {
        let temp = tempdir().unwrap();

        unsafe {
            std::env::set_var(ENV_HOME, temp.path());
        }
        let home = home_dir().unwrap();
        assert_eq!(home, temp.path());

        unsafe {
            std::env::remove_var(ENV_HOME);
        }
        // Without the override, the platform home is used
        assert_ne!(home_dir().unwrap(), temp.path());
    }

    #[test]
    #[serial]
    fn test_config_dir_override() {
        let temp = tempdir().unwrap();

        unsafe {
            std::env::set_var(ENV_CONFIG_DIR, temp.path());
        }
        assert_eq!(config_dir().unwrap(), temp.path());

        unsafe {
            std::env::remove_var(ENV_CONFIG_DIR);
        }
        let default = config_dir().unwrap();
        assert!(default.ends_with("mcpsync"));
    }

    #[test]
    #[serial]
    fn test_resolve_path_tilde() {
        let temp = tempdir().unwrap();
        unsafe {
            std::env::set_var(ENV_HOME, temp.path());
        }

        let resolved = resolve_path("~/.claude.json").unwrap();
        assert_eq!(resolved, temp.path().join(".claude.json"));

        unsafe {
            std::env::remove_var(ENV_HOME);
        }
    }

    #[test]
    fn test_resolve_path_rejects_user_tilde() {
        let result = resolve_path("~someone/config");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Tilde expansion"));
    }

    #[test]
    #[serial]
    fn test_resolve_path_env_var() {
        unsafe {
            std::env::set_var("MCPSYNC_TEST_BASE", "/opt/configs");
        }

        let resolved = resolve_path("$MCPSYNC_TEST_BASE/servers.json").unwrap();
        assert_eq!(resolved, PathBuf::from("/opt/configs/servers.json"));

        unsafe {
            std::env::remove_var("MCPSYNC_TEST_BASE");
        }
    }

    #[test]
    fn test_resolve_path_passthrough() {
        let resolved = resolve_path("relative/path.toml").unwrap();
        assert_eq!(resolved, PathBuf::from("relative/path.toml"));
    }

    #[test]
    fn test_windows_long_path_short_unchanged() {
        let path = Path::new("/tmp/short");
        assert_eq!(windows_long_path(path), PathBuf::from("/tmp/short"));
    }
}
