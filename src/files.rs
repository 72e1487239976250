//! Model file operations over a connection.

use crate::config::{paths, ConnectionConfig};
use crate::connection::ConnectionManager;
use crate::error::{EtabsError, Result};
use crate::model::AnalysisStatus;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of a successful open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The open command was issued and returned status 0.
    Opened,
    /// The file was already the loaded model; nothing was issued.
    AlreadyOpen,
}

impl OpenOutcome {
    pub fn was_already_open(&self) -> bool {
        matches!(self, OpenOutcome::AlreadyOpen)
    }
}

/// Reason an open request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// No instance could be attached.
    NotConnected,
    /// The open command returned a non-zero status.
    Status(i32),
    /// The interop layer failed.
    Call(String),
}

impl std::fmt::Display for OpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenError::NotConnected => write!(f, "Could not connect to ETABS"),
            OpenError::Status(code) => write!(f, "Failed to open file. Error code: {}", code),
            OpenError::Call(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for OpenError {}

/// File-level operations on the connected application.
///
/// Every query attaches on demand and fails closed when no instance is
/// reachable.
pub struct FileOperations {
    connection: ConnectionManager,
    e2k_format_code: i32,
}

impl FileOperations {
    pub fn new(connection: ConnectionManager, config: &ConnectionConfig) -> Self {
        Self {
            connection,
            e2k_format_code: config.e2k_format_code,
        }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager {
        &mut self.connection
    }

    /// Check that `path` exists and carries a model extension.
    pub fn is_valid_file(&self, path: &Path) -> bool {
        path.is_file() && paths::has_model_extension(path)
    }

    /// Application version, attaching if needed.
    pub fn version(&mut self) -> Option<String> {
        let app = self.attached()?;
        match app.version() {
            Ok(version) if !version.trim().is_empty() => Some(version.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!("Version lookup failed: {}", e);
                None
            }
        }
    }

    /// Path of the loaded model, or `None` when nothing is loaded.
    pub fn current_model_path(&mut self) -> Option<PathBuf> {
        let app = self.attached()?;
        match app.model_path() {
            Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
            Ok(_) => None,
            Err(e) => {
                debug!("Model path lookup failed: {}", e);
                None
            }
        }
    }

    /// Check whether `path` is the loaded model.
    pub fn is_file_open(&mut self, path: &Path) -> bool {
        self.current_model_path()
            .is_some_and(|current| paths::same_file(&current, path))
    }

    /// Open `path`, unless it is already the loaded model.
    pub fn open_model(&mut self, path: &Path) -> std::result::Result<OpenOutcome, OpenError> {
        if self.attached().is_none() {
            return Err(OpenError::NotConnected);
        }

        if self.is_file_open(path) {
            return Ok(OpenOutcome::AlreadyOpen);
        }

        let app = self
            .connection
            .application_mut()
            .ok_or(OpenError::NotConnected)?;

        debug!("Opening {}", path.display());
        match app.open_file(path) {
            Ok(0) => Ok(OpenOutcome::Opened),
            Ok(code) => Err(OpenError::Status(code)),
            Err(e) => Err(OpenError::Call(e.to_string())),
        }
    }

    /// Release the local session.
    ///
    /// The application is never closed: it may be in interactive use.
    pub fn close_model(&mut self) {
        self.connection.disconnect();
    }

    /// Analysis status of `path`, opening it if needed.
    ///
    /// Any failure yields `Unknown`.
    pub fn analysis_status(&mut self, path: &Path) -> AnalysisStatus {
        if let Err(e) = self.open_model(path) {
            debug!("Cannot query analysis status: {}", e);
            return AnalysisStatus::Unknown;
        }

        let Some(app) = self.connection.application() else {
            return AnalysisStatus::Unknown;
        };

        match app.case_statuses() {
            Ok(cases) => AnalysisStatus::from_cases(&cases),
            Err(e) => {
                warn!("Case status query failed: {}", e);
                AnalysisStatus::Unknown
            }
        }
    }

    /// Export `input` to the text format at `output`.
    ///
    /// Opens `input` first when it is not the loaded model.
    pub fn export_model(&mut self, input: &Path, output: &Path) -> Result<()> {
        self.open_model(input).map_err(|e| match e {
            OpenError::NotConnected => EtabsError::NotConnected,
            OpenError::Status(code) => EtabsError::Status {
                call: "OpenFile",
                code,
            },
            OpenError::Call(message) => EtabsError::com("OpenFile", message),
        })?;

        let format_code = self.e2k_format_code;
        let app = self
            .connection
            .application_mut()
            .ok_or(EtabsError::NotConnected)?;

        match app.export_file(output, format_code)? {
            0 => Ok(()),
            code => Err(EtabsError::Status {
                call: "ExportFile",
                code,
            }),
        }
    }

    fn attached(&mut self) -> Option<&dyn crate::api::EtabsApplication> {
        if !self.connection.is_connected() && !self.connection.try_connect() {
            return None;
        }
        self.connection.application()
    }
}
