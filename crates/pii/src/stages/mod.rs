//! Pipeline stages for C12 (PII Detector) and C13 (Redactor).

mod pii_detector_stage;
mod redactor_stage;

pub use pii_detector_stage::{PiiDetectorStage, PiiEntities};
pub use redactor_stage::RedactorStage;
