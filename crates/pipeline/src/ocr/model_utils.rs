//! Small shared helpers used by the OCR backend implementations.

use std::time::Instant;

use super::backend::{OcrBackendType, OcrResult};

pub const PDFTOPPM_NOT_FOUND: &str =
    "pdftoppm not found (install poppler-utils) — required to rasterize PDF pages for OCR";

/// Whether a binary is reachable on `PATH`.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

pub fn check_pdftoppm_hint() -> Option<String> {
    if check_binary("pdftoppm") {
        None
    } else {
        Some(PDFTOPPM_NOT_FOUND.to_string())
    }
}

pub fn build_ocr_result(
    text: String,
    backend: OcrBackendType,
    model: Option<String>,
    start: Instant,
) -> OcrResult {
    OcrResult {
        text,
        confidence: None,
        backend,
        model,
        processing_time_ms: start.elapsed().as_millis() as u64,
        hocr: None,
    }
}
