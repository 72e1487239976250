//! etab-cli - CLI tool to validate ETABS models and export them to E2K.
//!
//! Prints exactly one JSON result on stdout; logs go to stderr.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use etab_cli::{
    generate_e2k, platform_file_operations, validate_model, ConnectionConfig, GenerateE2kRequest,
    OperationResult,
};

/// Automate ETABS: validate model files and export them to E2K.
///
/// All commands print a JSON result.
#[derive(Parser, Debug)]
#[command(name = "etab-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check ETABS installation, file validity, and analysis status
    Validate {
        /// Path to ETABS file (.edb or .e2k) to validate
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Convert ETABS .edb file to .e2k text format
    #[command(name = "generate-e2k")]
    GenerateE2k {
        /// Path to input ETABS file (.edb)
        #[arg(short, long)]
        file: PathBuf,

        /// Path for output .e2k file (defaults to the input path with .e2k)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite output file if it already exists
        #[arg(
            long,
            alias = "force",
            num_args = 0..=1,
            require_equals = true,
            default_missing_value = "true",
            default_value_t = false,
            action = ArgAction::Set
        )]
        overwrite: bool,
    },
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => return report_usage_error(err),
    };

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(args.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    let config = ConnectionConfig::from_env();
    let mut files = platform_file_operations(&config);

    match command {
        Command::Validate { file } => {
            info!("Validating: {}", file.display());
            let result = validate_model(&mut files, Some(&file));
            emit(&result)
        }
        Command::GenerateE2k {
            file,
            output,
            overwrite,
        } => {
            info!("Generating E2K from: {}", file.display());
            let request = GenerateE2kRequest {
                input: file,
                output,
                overwrite,
            };
            let result = generate_e2k(&mut files, &request);
            emit(&result)
        }
    }
}

/// Print the result envelope and map it to an exit code.
fn emit<T: Serialize>(result: &OperationResult<T>) -> Result<ExitCode> {
    println!("{}", result.to_json()?);
    Ok(ExitCode::from(result.exit_code() as u8))
}

/// Help and version go through clap; every other parse error becomes a
/// failure envelope with exit code 1.
fn report_usage_error(err: clap::Error) -> ExitCode {
    if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        let _ = err.print();
        return ExitCode::SUCCESS;
    }

    // First paragraph of clap's message, without usage text.
    let rendered = err.to_string();
    let message = rendered
        .split("\n\n")
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let message = message.trim_start_matches("error:").trim().to_string();

    let result: OperationResult<()> = OperationResult::fail(message);
    if let Ok(json) = result.to_json() {
        println!("{}", json);
    }
    eprint!("{}", rendered);
    ExitCode::FAILURE
}
