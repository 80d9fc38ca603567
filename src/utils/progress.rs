//! Progress indicators for long-running scans.
//!
//! This module wraps the `indicatif` crate with consistent styling and
//! automation-friendly behavior. Project discovery can walk thousands of
//! directories, so the CLI shows a spinner that updates as the scan advances;
//! everything here degrades to hidden bars in non-interactive environments.
//!
//! # Environment Variables
//!
//! - `MCPSYNC_NO_PROGRESS`: Set to any value to disable all progress
//!   indicators
//!
//! # Examples
//!
//! ```rust
//! use mcpsync_cli::utils::progress::ProgressBar;
//!
//! let spinner = ProgressBar::new_spinner();
//! spinner.set_message("Scanning ~/projects...");
//!
//! // Long running operation
//!
//! spinner.finish_with_message("Scan complete");
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::ENV_NO_PROGRESS;

/// Checks if progress bars should be disabled.
///
/// Progress bars are disabled when the `MCPSYNC_NO_PROGRESS` environment
/// variable is set to any value, which keeps output clean in scripts and
/// CI pipelines.
fn is_progress_disabled() -> bool {
    std::env::var(ENV_NO_PROGRESS).is_ok()
}

/// A progress bar with consistent styling and automation-friendly behavior.
///
/// Wraps the `indicatif` progress bar. When progress output is disabled via
/// the environment, all operations are silently ignored, so call sites never
/// need to branch on interactivity.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a new progress bar with a specified total length.
    ///
    /// If progress bars are disabled via the environment, this creates a
    /// hidden bar that silently ignores all operations.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        };
        Self { inner: bar }
    }

    /// Creates a spinner for operations with an unknown amount of work,
    /// such as walking a directory tree whose size is not known up front.
    ///
    /// The animation updates every 100ms automatically.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { inner: bar }
    }

    /// Sets the message displayed alongside the progress bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Sets the prefix displayed before the progress bar.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Increments the progress bar by the specified amount.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Sets the current progress position directly.
    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    /// Finishes the progress bar and displays a completion message.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Finishes the progress bar and clears it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Returns `true` if this bar was created hidden.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap()
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_disabled_via_environment() {
        unsafe {
            std::env::set_var(ENV_NO_PROGRESS, "1");
        }

        let bar = ProgressBar::new(10);
        assert!(bar.is_hidden());

        let spinner = ProgressBar::new_spinner();
        assert!(spinner.is_hidden());

        unsafe {
            std::env::remove_var(ENV_NO_PROGRESS);
        }
    }

    #[test]
    #[serial]
    fn test_lifecycle_operations() {
        unsafe {
            std::env::set_var(ENV_NO_PROGRESS, "1");
        }

        // All operations are no-ops on hidden bars but must not panic
        let bar = ProgressBar::new(100);
        bar.set_prefix("scan");
        bar.set_message("walking directories");
        bar.inc(10);
        bar.set_position(50);
        bar.finish_with_message("done");

        let spinner = ProgressBar::new_spinner();
        spinner.set_message("scanning");
        spinner.finish_and_clear();

        unsafe {
            std::env::remove_var(ENV_NO_PROGRESS);
        }
    }
}
