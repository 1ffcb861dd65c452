//! OCR Extractor (C9): rasterizes scanned pages and dispatches to one of
//! five configurable engines, grounded on the corpus's `OcrBackendType`/
//! `OcrBackend`/`OcrManager` registry pattern.
//!
//! - **easyocr**, **paddleocr**: local CNN-based readers (CLI wrappers).
//! - **ocrmypdf**: local Tesseract wrapper that also emits hOCR word boxes.
//! - **trocr**, **docling**: remote HTTP endpoints, run as deferred work.

mod backend;
mod local;
mod model_utils;
mod pdf_utils;
mod remote;

pub use backend::{BackendConfig, OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrManager, OcrResult};
pub use local::{EasyOcrBackend, OcrMyPdfBackend, PaddleOcrBackend};
pub use remote::{DoclingBackend, TrocrBackend};

/// Builds an `OcrManager` with all five backends registered, primary
/// selected per the `OCR_ENGINE` configuration value (default `easyocr`).
pub fn default_manager(primary: OcrBackendType, config: OcrConfig) -> OcrManager {
    let mut manager = OcrManager::new(primary);
    manager.register(Box::new(EasyOcrBackend::with_config(config.clone())));
    manager.register(Box::new(PaddleOcrBackend::with_config(config.clone())));
    manager.register(Box::new(OcrMyPdfBackend::with_config(config.clone())));
    manager.register(Box::new(TrocrBackend::with_config(config.clone())));
    manager.register(Box::new(DoclingBackend::with_config(config)));
    manager
}
