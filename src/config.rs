//! Configuration constants and settings for the ETABS adapter.

use std::path::Path;
use std::time::Duration;

/// COM ProgID of the ETABS automation object.
pub const ETABS_PROG_ID: &str = "CSI.ETABS.API.ETABSObject";

/// Binary model extension (lowercase, with dot).
pub const EDB_EXTENSION: &str = ".edb";

/// Text interchange extension (lowercase, with dot).
pub const E2K_EXTENSION: &str = ".e2k";

/// Extensions accepted as ETABS model files.
pub const MODEL_EXTENSIONS: [&str; 2] = [EDB_EXTENSION, E2K_EXTENSION];

/// Settling delay after a fresh instance is created.
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 2000;

/// `eFileTypeIO` value selecting the text (.e2k) writer.
pub const E2K_EXPORT_FORMAT_CODE: i32 = 4;

/// Case status reported for a finished analysis run.
pub const CASE_STATUS_FINISHED: i32 = 4;

/// Environment variable overriding the settling delay.
pub const ENV_STARTUP_DELAY_MS: &str = "ETAB_STARTUP_DELAY_MS";

/// Environment variable overriding the ProgID.
pub const ENV_PROG_ID: &str = "ETAB_PROG_ID";

/// Environment variable overriding the export format code.
pub const ENV_E2K_FORMAT_CODE: &str = "ETAB_E2K_FORMAT_CODE";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// ProgID used to probe, create and attach.
    pub prog_id: String,
    /// Delay after starting a new instance.
    pub startup_delay: Duration,
    /// Format code passed to the export call.
    pub e2k_format_code: i32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            prog_id: ETABS_PROG_ID.to_string(),
            startup_delay: Duration::from_millis(DEFAULT_STARTUP_DELAY_MS),
            e2k_format_code: E2K_EXPORT_FORMAT_CODE,
        }
    }
}

impl ConnectionConfig {
    /// Build a configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(prog_id) = lookup(ENV_PROG_ID).filter(|s| !s.trim().is_empty()) {
            config.prog_id = prog_id.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_STARTUP_DELAY_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.startup_delay = Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!("Ignoring {}={:?}: not a number", ENV_STARTUP_DELAY_MS, raw)
                }
            }
        }

        if let Some(raw) = lookup(ENV_E2K_FORMAT_CODE) {
            match raw.trim().parse::<i32>() {
                Ok(code) => config.e2k_format_code = code,
                Err(_) => {
                    tracing::warn!("Ignoring {}={:?}: not a number", ENV_E2K_FORMAT_CODE, raw)
                }
            }
        }

        config
    }
}

/// Path helpers shared by the orchestrators.
pub mod paths {
    use super::*;
    use std::path::{Component, PathBuf};

    /// Lowercased extension with a leading dot, or an empty string.
    pub fn extension_of(path: &Path) -> String {
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    /// Check whether the extension is one of the model extensions.
    pub fn has_model_extension(path: &Path) -> bool {
        MODEL_EXTENSIONS.contains(&extension_of(path).as_str())
    }

    /// File name for display, falling back to the whole path.
    pub fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// Absolute, lowercased form used for "same file" comparisons.
    ///
    /// `.` and `..` are resolved lexically, so symlinks are not followed.
    pub fn comparison_key(path: &Path) -> String {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        normalized.to_string_lossy().to_lowercase()
    }

    /// Case-insensitive comparison of two paths after making them absolute.
    pub fn same_file(a: &Path, b: &Path) -> bool {
        comparison_key(a) == comparison_key(b)
    }
}
