//! Test utilities for mcpsync.
//!
//! This module provides helpers for writing tests: a sandboxed
//! [`TestEnvironment`] holding client configuration files and an isolated
//! enablement store, plus one-time logging initialization.
//!
//! # Test Isolation
//!
//! Every [`TestEnvironment`] owns its own temporary directory acting as
//! the home directory, so client files, project files, and the store never
//! touch the real user configuration. Integration tests export the
//! environment's variables ([`TestEnvironment::env_vars`]) into the spawned
//! binary; unit tests build a registry against it directly
//! ([`TestEnvironment::registry`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use mcpsync_cli::test_utils::TestEnvironment;
//!
//! let env = TestEnvironment::new().unwrap();
//! env.write_claude(r#"{"mcpServers": {}}"#).unwrap();
//! assert!(env.claude_path().exists());
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::constants::{ENV_CONFIG_DIR, ENV_HOME, PROJECT_CONFIG_FILE, STORE_FILE};
use crate::server::ClientRegistry;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Installs the tracing subscriber once regardless of how many times it is
/// called. Respects the `RUST_LOG` environment variable if set, or uses
/// the provided level; with neither, logging stays off.
///
/// # Example
///
/// ```rust,no_run
/// use tracing::Level;
///
/// fn my_test() {
///     // Use environment variable
///     mcpsync_cli::test_utils::init_test_logging(None);
///
///     // Or set level programmatically
///     mcpsync_cli::test_utils::init_test_logging(Some(Level::DEBUG));
/// }
/// ```
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            // No logging if neither is provided
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer() // Important: uses test-compatible writer
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// A sandboxed home directory with client configuration files and an
/// isolated enablement store.
///
/// The temporary directory is removed when the environment drops.
pub struct TestEnvironment {
    root: TempDir,
}

impl TestEnvironment {
    /// Creates a fresh, empty environment.
    ///
    /// # Errors
    ///
    /// Fails if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        // Initialize test logging if RUST_LOG is set
        init_test_logging(None);

        Ok(Self { root: tempfile::tempdir()? })
    }

    /// The sandboxed home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        self.root.path()
    }

    /// The sandboxed configuration directory holding the store.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    /// Path of the enablement store inside [`config_dir`](Self::config_dir).
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.config_dir().join(STORE_FILE)
    }

    /// Environment variable pairs pointing a spawned `mcpsync` process at
    /// this sandbox.
    #[must_use]
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENV_HOME, self.home().display().to_string()),
            (ENV_CONFIG_DIR, self.config_dir().display().to_string()),
        ]
    }

    /// A client registry rooted at this sandbox's home directory.
    #[must_use]
    pub fn registry(&self) -> ClientRegistry {
        ClientRegistry::with_home(self.home())
    }

    /// Path of the Claude configuration file.
    #[must_use]
    pub fn claude_path(&self) -> PathBuf {
        self.home().join(".claude.json")
    }

    /// Path of the Gemini settings file.
    #[must_use]
    pub fn gemini_path(&self) -> PathBuf {
        self.home().join(".gemini").join("settings.json")
    }

    /// Path of the Codex configuration file.
    #[must_use]
    pub fn codex_path(&self) -> PathBuf {
        self.home().join(".codex").join("config.toml")
    }

    /// Writes the Claude configuration file.
    ///
    /// # Errors
    ///
    /// Fails on filesystem errors.
    pub fn write_claude(&self, content: &str) -> Result<()> {
        write(&self.claude_path(), content)
    }

    /// Writes the Gemini settings file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on filesystem errors.
    pub fn write_gemini(&self, content: &str) -> Result<()> {
        write(&self.gemini_path(), content)
    }

    /// Writes the Codex configuration file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on filesystem errors.
    pub fn write_codex(&self, content: &str) -> Result<()> {
        write(&self.codex_path(), content)
    }

    /// Writes the enablement store file directly.
    ///
    /// # Errors
    ///
    /// Fails on filesystem errors.
    pub fn write_store(&self, content: &str) -> Result<()> {
        write(&self.store_path(), content)
    }

    /// Creates a project directory under the home with a `.mcp.json`
    /// holding `content`, returning the project directory.
    ///
    /// # Errors
    ///
    /// Fails on filesystem errors.
    pub fn write_project(&self, rel: &str, content: &str) -> Result<PathBuf> {
        let dir = self.home().join(rel);
        write(&dir.join(PROJECT_CONFIG_FILE), content)?;
        Ok(dir)
    }

    /// Reads any file under the sandbox as UTF-8.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or not valid UTF-8.
    pub fn read(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_layout() {
        let env = TestEnvironment::new().unwrap();
        env.write_claude(r#"{"mcpServers": {}}"#).unwrap();
        env.write_gemini(r#"{"mcpServers": {}}"#).unwrap();
        env.write_codex("[mcp_servers]\n").unwrap();

        assert!(env.claude_path().exists());
        assert!(env.gemini_path().starts_with(env.home()));
        assert!(env.codex_path().exists());
        assert_eq!(env.store_path().file_name().unwrap(), STORE_FILE);
    }

    #[test]
    fn test_write_project_places_definition_file() {
        let env = TestEnvironment::new().unwrap();
        let dir = env.write_project("work/app", r#"{"mcpServers": {}}"#).unwrap();
        assert!(dir.join(PROJECT_CONFIG_FILE).exists());
        assert!(dir.starts_with(env.home()));
    }

    #[test]
    fn test_env_vars_point_at_sandbox() {
        let env = TestEnvironment::new().unwrap();
        let vars = env.env_vars();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].0, ENV_HOME);
        assert_eq!(vars[1].0, ENV_CONFIG_DIR);
        assert!(vars[1].1.contains("config"));
    }
}
