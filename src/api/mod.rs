//! Boundary to the ETABS automation interface.
//!
//! The tool depends only on the primitives below. Every one of them may fail;
//! callers above this module degrade failures instead of propagating them.

#[cfg(windows)]
mod com;
mod unsupported;

#[cfg(windows)]
pub use com::ComBackend;
pub use unsupported::UnsupportedBackend;

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::model::CaseStatus;
use std::path::Path;

/// Entry points that locate or launch the application.
pub trait AutomationBackend {
    /// Check whether the automation class is registered on this host.
    fn is_installed(&self) -> bool;

    /// Check whether an instance is currently running.
    fn is_running(&self) -> Result<bool>;

    /// Launch a new instance and return its handle.
    fn create(&self) -> Result<Box<dyn EtabsApplication>>;

    /// Attach to the running instance.
    fn attach(&self) -> Result<Box<dyn EtabsApplication>>;
}

/// Handle to a live application instance.
pub trait EtabsApplication {
    /// Human-readable application version.
    fn version(&self) -> Result<String>;

    /// Full path of the loaded model, empty when nothing is loaded.
    fn model_path(&self) -> Result<String>;

    /// Open a model file. Returns the API status code (0 = success).
    fn open_file(&mut self, path: &Path) -> Result<i32>;

    /// Run status of every load case in the loaded model.
    fn case_statuses(&self) -> Result<Vec<CaseStatus>>;

    /// Export the loaded model. Returns the API status code (0 = success).
    fn export_file(&mut self, path: &Path, format_code: i32) -> Result<i32>;
}

/// Backend for the current platform.
#[cfg(windows)]
pub fn platform_backend(config: &ConnectionConfig) -> Box<dyn AutomationBackend> {
    Box::new(ComBackend::new(config.prog_id.clone()))
}

/// Backend for the current platform.
#[cfg(not(windows))]
pub fn platform_backend(_config: &ConnectionConfig) -> Box<dyn AutomationBackend> {
    Box::new(UnsupportedBackend)
}
