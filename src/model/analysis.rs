//! Analysis status of a loaded model.

use crate::config::CASE_STATUS_FINISHED;
use serde::{Deserialize, Serialize};

/// Run status of one load case, as reported by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStatus {
    /// Load case name.
    pub name: String,
    /// Raw status code (1 not run, 2 could not start, 3 not finished, 4 finished).
    pub status: i32,
}

impl CaseStatus {
    pub fn new(name: impl Into<String>, status: i32) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Check if the analysis run for this case has finished.
    pub fn is_finished(&self) -> bool {
        self.status == CASE_STATUS_FINISHED
    }
}

/// Whether a model has been analyzed.
///
/// `Unknown` means the status could not be determined, which is distinct
/// from a confirmed `NotAnalyzed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisStatus {
    Analyzed,
    NotAnalyzed,
    Unknown,
}

impl AnalysisStatus {
    /// Derive the model status from its case statuses.
    pub fn from_cases(cases: &[CaseStatus]) -> Self {
        if cases.iter().any(CaseStatus::is_finished) {
            AnalysisStatus::Analyzed
        } else {
            AnalysisStatus::NotAnalyzed
        }
    }

    /// Collapse to the boolean reported as `isAnalyzed`.
    pub fn is_analyzed(&self) -> bool {
        matches!(self, AnalysisStatus::Analyzed)
    }
}
