//! PII detection and redaction (C12, C13).
//!
//! Detects personally identifiable and case-sensitive spans in extracted
//! document text via a regex table unioned with a pluggable NER backend,
//! domain-switched the way the source anonymization Lambda switches engines
//! and regex tables by document classification. The Redactor then maps
//! those spans onto hOCR word boxes and paints them out of the original
//! PDF or image.

pub mod detector;
pub mod redactor;
pub mod stages;

pub use detector::PiiDetector;
pub use redactor::{redact, RedactionInput};
pub use stages::{PiiDetectorStage, PiiEntities, RedactorStage};
