//! etab-cli - ETABS model validation and E2K export.
//!
//! This library drives an installed ETABS application through its COM
//! automation interface. It checks the installation, validates model files,
//! reports analysis status and exports `.edb` models to the `.e2k` text format.
//! The model the user had open is restored after each operation.
//!
//! # Example
//!
//! ```no_run
//! use etab_cli::{generate_e2k, platform_file_operations, ConnectionConfig, GenerateE2kRequest};
//!
//! let config = ConnectionConfig::from_env();
//! let mut files = platform_file_operations(&config);
//! let result = generate_e2k(&mut files, &GenerateE2kRequest::new("tower.edb"));
//! println!("{}", result.to_json().unwrap());
//! ```

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod files;
pub mod generator;
pub mod model;
pub mod validation;

mod steps;

// Re-exports for convenience
pub use api::{AutomationBackend, EtabsApplication};
pub use config::ConnectionConfig;
pub use connection::ConnectionManager;
pub use error::{ErrorCode, EtabsError, Result};
pub use files::{FileOperations, OpenError, OpenOutcome};
pub use generator::{generate_e2k, GenerateE2kRequest};
pub use model::{
    AnalysisStatus, CaseStatus, GenerateE2kData, MessageTrail, OperationResult, ValidationData,
};
pub use validation::validate_model;

/// Build file operations over `backend`.
pub fn file_operations(
    backend: Box<dyn AutomationBackend>,
    config: &ConnectionConfig,
) -> FileOperations {
    FileOperations::new(ConnectionManager::new(backend, config), config)
}

/// Build file operations over the backend for the current platform.
pub fn platform_file_operations(config: &ConnectionConfig) -> FileOperations {
    file_operations(api::platform_backend(config), config)
}
