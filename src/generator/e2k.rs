//! Export of a binary model to the E2K text format.

use crate::config::{paths, EDB_EXTENSION, E2K_EXTENSION};
use crate::files::FileOperations;
use crate::model::{GenerateE2kData, MessageTrail, OperationResult};
use crate::steps::{run_guarded, StepFailure, StepResult};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Parameters of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateE2kRequest {
    /// Source `.edb` model.
    pub input: PathBuf,
    /// Destination; defaults to the input path with an `.e2k` extension.
    pub output: Option<PathBuf>,
    /// Replace an existing destination file.
    pub overwrite: bool,
}

impl GenerateE2kRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            overwrite: false,
        }
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Destination path, applying the default when none was given.
    pub fn resolved_output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// Default destination: same directory and stem as `input`, `.e2k` extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(E2K_EXTENSION.trim_start_matches('.'))
}

/// Convert the model at `request.input` into an E2K file.
///
/// The model that was open before the export is reopened afterwards, unless
/// it was the input itself.
pub fn generate_e2k(
    files: &mut FileOperations,
    request: &GenerateE2kRequest,
) -> OperationResult<GenerateE2kData> {
    let mut run = ExportRun::new(request);
    let outcome = run_guarded(|| run.execute(files, request));
    run.finish(request, outcome)
}

struct ExportRun {
    data: GenerateE2kData,
    started: Instant,
}

impl ExportRun {
    fn new(request: &GenerateE2kRequest) -> Self {
        Self {
            data: GenerateE2kData::new(&request.input),
            started: Instant::now(),
        }
    }

    fn messages(&mut self) -> &mut MessageTrail {
        &mut self.data.messages
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn execute(
        &mut self,
        files: &mut FileOperations,
        request: &GenerateE2kRequest,
    ) -> StepResult<()> {
        let input = request.input.as_path();
        self.check_input_exists(input)?;
        self.check_input_type(input)?;

        let output = self.resolve_output(request);
        let output_exists = self.check_output(&output, request.overwrite)?;
        self.data.output_exists = Some(output_exists);

        self.ensure_output_dir(&output)?;
        self.connect(files)?;

        let original = self.snapshot_open_file(files);
        let input_already_open = files.is_file_open(input);

        // The input is loaded once export starts, so restore on failure too.
        let exported = self.export(files, input, &output);
        if exported.is_ok() {
            self.read_output_size(&output);
        }

        if let Some(original) = original {
            if !input_already_open && !paths::same_file(&original, input) {
                self.restore(files, &original);
            }
        }

        exported
    }

    fn check_input_exists(&mut self, input: &Path) -> StepResult<()> {
        let exists = input.try_exists()? && input.is_file();
        self.data.file_exists = exists;

        if !exists {
            self.messages()
                .fail(format!("Input file not found: {}", input.display()));
            return Err(StepFailure::check("Input file not found"));
        }

        self.messages()
            .pass(format!("Input file exists: {}", paths::display_name(input)));
        Ok(())
    }

    fn check_input_type(&mut self, input: &Path) -> StepResult<()> {
        let extension = paths::extension_of(input);
        self.data.file_extension = Some(extension.clone());

        if extension != EDB_EXTENSION {
            let shown = if extension.is_empty() {
                "(none)"
            } else {
                extension.as_str()
            };
            self.messages()
                .fail(format!("Invalid input file type: {}", shown));
            self.messages()
                .hint(format!("Expected: {} file", EDB_EXTENSION));
            return Err(StepFailure::check(format!(
                "Invalid input file type. Only {} files can be converted to {}",
                EDB_EXTENSION, E2K_EXTENSION
            )));
        }

        self.messages()
            .pass(format!("Valid input file type: {}", extension));
        Ok(())
    }

    fn resolve_output(&mut self, request: &GenerateE2kRequest) -> PathBuf {
        let output = request.resolved_output();
        if request.output.is_none() {
            self.messages().info(format!(
                "Using default output path: {}",
                paths::display_name(&output)
            ));
        }
        self.data.output_file = Some(output.clone());
        output
    }

    /// Returns whether the destination already exists.
    fn check_output(&mut self, output: &Path, overwrite: bool) -> StepResult<bool> {
        let exists = output.try_exists()?;

        if exists && !overwrite {
            self.data.output_exists = Some(true);
            self.messages()
                .fail(format!("Output file already exists: {}", output.display()));
            self.messages()
                .hint("Use --overwrite flag to replace existing file");
            return Err(StepFailure::check("Output file already exists"));
        }

        if exists {
            self.messages().warn(format!(
                "Output file will be overwritten: {}",
                paths::display_name(output)
            ));
        }
        Ok(exists)
    }

    fn ensure_output_dir(&mut self, output: &Path) -> StepResult<()> {
        let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };

        if dir.is_dir() {
            return Ok(());
        }

        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                self.messages()
                    .pass(format!("Created output directory: {}", dir.display()));
                Ok(())
            }
            Err(e) => {
                self.messages()
                    .fail(format!("Failed to create output directory: {}", e));
                Err(StepFailure::check("Failed to create output directory"))
            }
        }
    }

    fn connect(&mut self, files: &mut FileOperations) -> StepResult<()> {
        if files.connection().is_connected() {
            return Ok(());
        }

        self.messages().info("Connecting to ETABS...");
        if !files.connection_mut().ensure_available() {
            self.messages().fail("Could not connect to ETABS");
            self.messages()
                .hint("Please start ETABS and make sure it is running");
            return Err(StepFailure::check("Could not connect to ETABS"));
        }

        self.messages().pass("Connected to ETABS");
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

    fn export(
        &mut self,
        files: &mut FileOperations,
        input: &Path,
        output: &Path,
    ) -> StepResult<()> {
        self.messages().info("Generating E2K file...");
        info!("Exporting {} to {}", input.display(), output.display());

        let outcome = files.export_model(input, output);
        self.data.generation_time_ms = Some(self.elapsed_ms());

        match outcome {
            Ok(()) => {
                self.data.generation_successful = Some(true);
                self.messages().pass("E2K file generated successfully");
                Ok(())
            }
            Err(e) => {
                self.data.generation_successful = Some(false);
                self.messages()
                    .fail(format!("Failed to generate E2K file: {}", e));
                Err(StepFailure::check("E2K generation failed"))
            }
        }
    }

    fn read_output_size(&mut self, output: &Path) {
        match std::fs::metadata(output) {
            Ok(meta) => {
                self.data.file_size_bytes = Some(meta.len());
                self.messages()
                    .info(format!("Output file size: {}", format_file_size(meta.len())));
            }
            Err(e) => debug!("Could not read size of {}: {}", output.display(), e),
        }
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

    fn finish(
        self,
        request: &GenerateE2kRequest,
        outcome: StepResult<()>,
    ) -> OperationResult<GenerateE2kData> {
        let elapsed = self.elapsed_ms();
        let mut data = self.data;

        match outcome {
            Ok(()) => {
                data.generation_time_ms = Some(elapsed);
                info!("E2K generated in {} ms", elapsed);
                OperationResult::ok(data)
            }
            Err(StepFailure::Check(error)) => {
                info!("E2K generation stopped: {}", error);
                OperationResult::fail(error).with_data(data)
            }
            Err(StepFailure::Unexpected(e)) => {
                warn!("Unexpected error during E2K generation: {:#}", e);
                data.messages.fail(format!("Unexpected error: {}", e));
                data.file_exists = request.input.is_file();
                data.file_extension = Some(paths::extension_of(&request.input));
                data.generation_successful = Some(false);
                data.generation_time_ms = Some(elapsed);
                OperationResult::fail(format!("E2K generation failed: {}", e)).with_data(data)
            }
        }
    }
}

/// Human-readable size with up to two decimals, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut len = bytes as f64;
    let mut order = 0;
    while len >= 1024.0 && order < UNITS.len() - 1 {
        order += 1;
        len /= 1024.0;
    }

    let text = format!("{:.2}", len);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[order])
}
