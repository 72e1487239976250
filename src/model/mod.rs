//! Data model types for ETABS validation and export.

mod analysis;
mod messages;
mod payload;
mod result;

pub use analysis::{AnalysisStatus, CaseStatus};
pub use messages::MessageTrail;
pub use payload::{GenerateE2kData, ValidationData};
pub use result::OperationResult;
