//! Validation of the ETABS installation and a model file.

use crate::config::{paths, EDB_EXTENSION, E2K_EXTENSION};
use crate::files::FileOperations;
use crate::model::{AnalysisStatus, MessageTrail, OperationResult, ValidationData};
use crate::steps::{run_guarded, StepFailure, StepResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Validate the installation and, when `path` is given, the model file.
///
/// Without a path only installation and version are reported. Every step
/// appends to the message trail, whether it passes or not.
pub fn validate_model(
    files: &mut FileOperations,
    path: Option<&Path>,
) -> OperationResult<ValidationData> {
    let mut run = ValidationRun::default();
    let outcome = run_guarded(|| run.execute(files, path));
    run.finish(outcome)
}

#[derive(Default)]
struct ValidationRun {
    data: ValidationData,
}

impl ValidationRun {
    fn messages(&mut self) -> &mut MessageTrail {
        &mut self.data.validation_messages
    }

    fn execute(&mut self, files: &mut FileOperations, path: Option<&Path>) -> StepResult<()> {
        self.check_installed(files)?;

        let Some(path) = path else {
            info!("No file given, reporting installation only");
            self.lookup_version(files);
            return Ok(());
        };

        self.data.file_path = Some(path.to_path_buf());
        self.check_exists(path)?;
        self.check_file_type(files, path)?;
        self.lookup_version(files);

        let original = self.snapshot_open_file(files);
        let already_open = self.ensure_open(files, path)?;
        self.check_analysis(files, path);

        if let Some(original) = original {
            if !already_open && !paths::same_file(&original, path) {
                self.restore(files, &original);
            }
        }

        self.data.file_valid = Some(true);
        Ok(())
    }

    fn check_installed(&mut self, files: &FileOperations) -> StepResult<()> {
        if !files.connection().is_installed() {
            self.data.etabs_installed = false;
            self.messages()
                .fail("ETABS is not installed or its automation interface is not registered");
            self.messages()
                .hint("Please install ETABS, or start it once so it registers its API");
            return Err(StepFailure::check("ETABS installation not found or not running"));
        }

        self.data.etabs_installed = true;
        self.messages().pass("ETABS is installed");
        Ok(())
    }

    fn lookup_version(&mut self, files: &mut FileOperations) {
        let version = files.version();
        match &version {
            Some(v) => self.messages().pass(format!("ETABS version: {}", v)),
            None => self.messages().warn("ETABS version: Unknown"),
        }
        self.data.etabs_version = version;
    }

    fn check_exists(&mut self, path: &Path) -> StepResult<()> {
        let exists = path.try_exists()? && path.is_file();
        self.data.file_exists = Some(exists);

        if !exists {
            self.messages()
                .fail(format!("File not found: {}", path.display()));
            return Err(StepFailure::check("File not found"));
        }

        self.messages()
            .pass(format!("File exists: {}", paths::display_name(path)));
        Ok(())
    }

    fn check_file_type(&mut self, files: &FileOperations, path: &Path) -> StepResult<()> {
        let extension = paths::extension_of(path);
        self.data.file_extension = Some(extension.clone());

        if !files.is_valid_file(path) {
            self.data.file_valid = Some(false);
            let shown = if extension.is_empty() {
                "(none)"
            } else {
                extension.as_str()
            };
            self.messages().fail(format!("Invalid file type: {}", shown));
            self.messages()
                .hint(format!("Expected: {} or {}", EDB_EXTENSION, E2K_EXTENSION));
            return Err(StepFailure::check("Invalid file type"));
        }

        self.messages()
            .pass(format!("Valid ETABS file type: {}", extension));
        Ok(())
    }

    fn snapshot_open_file(&mut self, files: &mut FileOperations) -> Option<PathBuf> {
        let original = files.current_model_path();
        if let Some(open) = &original {
            self.messages()
                .info(format!("Currently open file: {}", paths::display_name(open)));
        }
        original
    }

    /// Returns whether the file was already the loaded model.
    fn ensure_open(&mut self, files: &mut FileOperations, path: &Path) -> StepResult<bool> {
        if files.is_file_open(path) {
            self.messages().pass("File is already open in ETABS");
            return Ok(true);
        }

        self.messages().info(format!(
            "Opening file for validation: {}",
            paths::display_name(path)
        ));

        if let Err(e) = files.open_model(path) {
            self.data.file_valid = Some(false);
            self.messages()
                .fail(format!("Failed to open file for validation: {}", e));
            return Err(StepFailure::check("Could not open file for validation"));
        }

        Ok(false)
    }

    fn check_analysis(&mut self, files: &mut FileOperations, path: &Path) {
        let status = files.analysis_status(path);
        match status {
            AnalysisStatus::Analyzed => self.messages().pass("Model has been analyzed"),
            AnalysisStatus::NotAnalyzed => self.messages().warn("Model has not been analyzed"),
            AnalysisStatus::Unknown => self
                .messages()
                .warn("Could not determine analysis status; treating model as not analyzed"),
        }
        self.data.is_analyzed = Some(status.is_analyzed());
        self.data.analysis_status = Some(status);
    }

    fn restore(&mut self, files: &mut FileOperations, original: &Path) {
        self.messages().info(format!(
            "Restoring previously open file: {}",
            paths::display_name(original)
        ));

        if let Err(e) = files.open_model(original) {
            warn!("Restore of {} failed: {}", original.display(), e);
            self.messages().warn(format!(
                "Warning: Could not restore original file. User may need to manually reopen: {}",
                original.display()
            ));
        }
    }

    fn finish(self, outcome: StepResult<()>) -> OperationResult<ValidationData> {
        let mut data = self.data;
        match outcome {
            Ok(()) => {
                info!("Validation passed");
                OperationResult::ok(data)
            }
            Err(StepFailure::Check(error)) => {
                info!("Validation failed: {}", error);
                OperationResult::fail(error).with_data(data)
            }
            Err(StepFailure::Unexpected(e)) => {
                warn!("Validation error: {:#}", e);
                data.validation_messages
                    .fail(format!("Unexpected error: {}", e));
                OperationResult::fail(format!("Validation failed: {}", e)).with_data(data)
            }
        }
    }
}
