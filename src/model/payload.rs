//! Command payloads embedded in the result envelope.

use super::{AnalysisStatus, MessageTrail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Payload of the `validate` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationData {
    pub etabs_installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etabs_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_analyzed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_status: Option<AnalysisStatus>,
    pub validation_messages: MessageTrail,
}

/// Payload of the `generate-e2k` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateE2kData {
    pub input_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub file_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_successful: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time_ms: Option<u64>,
    pub messages: MessageTrail,
}

impl GenerateE2kData {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            ..Default::default()
        }
    }
}
