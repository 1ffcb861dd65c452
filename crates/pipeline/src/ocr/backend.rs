//! OCR backend abstraction (C9): each of the engines the component can
//! dispatch to is an `OcrBackend` impl, registered with an `OcrManager`
//! keyed by the configured primary.

#![allow(dead_code)]

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use idp_core::models::HocrPage;

use super::model_utils::build_ocr_result;
use super::pdf_utils;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Rate limited by {backend}, retry after {retry_after_secs:?}s")]
    RateLimited {
        backend: OcrBackendType,
        retry_after_secs: Option<u64>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OcrError> for idp_core::error::IdpError {
    fn from(err: OcrError) -> Self {
        idp_core::error::IdpError::OcrFailed(err.to_string())
    }
}

/// Result of OCR processing on one page.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub confidence: Option<f32>,
    pub backend: OcrBackendType,
    pub model: Option<String>,
    pub processing_time_ms: u64,
    /// Present only for backends that emit word-level bounding boxes
    /// (`ocrmypdf`, per §4.9 — hOCR output feeds the Redactor).
    pub hocr: Option<HocrPage>,
}

/// The five OCR engines the component can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrBackendType {
    /// EasyOCR — local CNN-based OCR, CPU/GPU.
    EasyOcr,
    /// PaddleOCR via ONNX Runtime — local, CPU/GPU.
    PaddleOcr,
    /// ocrmypdf — local CLI wrapper around Tesseract that also emits hOCR.
    OcrMyPdf,
    /// TrOCR — remote transformer-based OCR endpoint.
    Trocr,
    /// Docling — remote document-understanding OCR endpoint.
    Docling,
}

impl OcrBackendType {
    /// Whether this backend sends work to a remote API rather than running
    /// locally. Deferred backends run as concurrent consumers in deep mode.
    pub fn is_deferred(&self) -> bool {
        matches!(self, OcrBackendType::Trocr | OcrBackendType::Docling)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::EasyOcr => "easyocr",
            OcrBackendType::PaddleOcr => "paddleocr",
            OcrBackendType::OcrMyPdf => "ocrmypdf",
            OcrBackendType::Trocr => "trocr",
            OcrBackendType::Docling => "docling",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easyocr" => Some(OcrBackendType::EasyOcr),
            "paddleocr" | "paddle" => Some(OcrBackendType::PaddleOcr),
            "ocrmypdf" => Some(OcrBackendType::OcrMyPdf),
            "trocr" => Some(OcrBackendType::Trocr),
            "docling" => Some(OcrBackendType::Docling),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed, API key set).
    fn is_available(&self) -> bool;

    /// Description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Core OCR: extract text (and, for `ocrmypdf`, word boxes) from an image.
    fn run_ocr(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError>;

    fn is_deferred(&self) -> bool {
        self.backend_type().is_deferred()
    }

    fn model_name(&self) -> Option<String> {
        None
    }

    /// Run OCR on an image file, returning a timed result.
    fn ocr_image(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let (text, hocr) = self.run_ocr(image_path)?;
        let mut result = build_ocr_result(text, self.backend_type(), self.model_name(), start);
        result.hocr = hocr;
        Ok(result)
    }

    /// Rasterize one page of a PDF at the configured DPI, then OCR it.
    fn ocr_pdf_page(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let temp_dir = tempfile::TempDir::new()?;
        let image_path = pdf_utils::pdf_page_to_image(pdf_path, page, dpi, temp_dir.path())?;
        let (text, hocr) = self.run_ocr(&image_path)?;
        let mut result = build_ocr_result(text, self.backend_type(), self.model_name(), start);
        result.hocr = hocr;
        Ok(result)
    }
}

/// Configuration for OCR backends (language, DPI, model paths).
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "chi_sim").
    pub language: String,
    /// Rasterization DPI — default 300 per §4.9.
    pub dpi: u32,
    pub model_path: Option<std::path::PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
            model_path: None,
        }
    }
}

/// Shared base configuration embedded by all OCR backends.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub ocr: OcrConfig,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { ocr: config }
    }
}

/// Registry of OCR backends, enabling per-document-type backend selection.
pub struct OcrManager {
    backends: Vec<Box<dyn OcrBackend>>,
    primary: OcrBackendType,
}

impl OcrManager {
    pub fn new(primary: OcrBackendType) -> Self {
        Self {
            backends: Vec::new(),
            primary,
        }
    }

    pub fn register(&mut self, backend: Box<dyn OcrBackend>) {
        self.backends.push(backend);
    }

    pub fn set_primary(&mut self, backend_type: OcrBackendType) {
        self.primary = backend_type;
    }

    pub fn primary(&self) -> Option<&dyn OcrBackend> {
        self.backends
            .iter()
            .find(|b| b.backend_type() == self.primary)
            .map(|b| b.as_ref())
    }

    pub fn get(&self, backend_type: OcrBackendType) -> Option<&dyn OcrBackend> {
        self.backends
            .iter()
            .find(|b| b.backend_type() == backend_type)
            .map(|b| b.as_ref())
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn OcrBackend> {
        self.backends.iter().map(|b| b.as_ref())
    }

    pub fn available_backends(&self) -> impl Iterator<Item = &dyn OcrBackend> {
        self.backends
            .iter()
            .filter(|b| b.is_available())
            .map(|b| b.as_ref())
    }

    fn get_ready_primary(&self) -> Result<&dyn OcrBackend, OcrError> {
        let backend = self.primary().ok_or_else(|| {
            OcrError::BackendNotAvailable(format!(
                "Primary backend {} not registered",
                self.primary
            ))
        })?;
        if !backend.is_available() {
            return Err(OcrError::BackendNotAvailable(backend.availability_hint()));
        }
        Ok(backend)
    }

    fn get_ready_backend(&self, backend_type: OcrBackendType) -> Result<&dyn OcrBackend, OcrError> {
        let backend = self.get(backend_type).ok_or_else(|| {
            OcrError::BackendNotAvailable(format!("Backend {} not registered", backend_type))
        })?;
        if !backend.is_available() {
            return Err(OcrError::BackendNotAvailable(backend.availability_hint()));
        }
        Ok(backend)
    }

    pub fn ocr_pdf_page(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<OcrResult, OcrError> {
        self.get_ready_primary()?.ocr_pdf_page(pdf_path, page, dpi)
    }

    pub fn ocr_pdf_page_with(
        &self,
        pdf_path: &Path,
        page: u32,
        dpi: u32,
        backend_type: OcrBackendType,
    ) -> Result<OcrResult, OcrError> {
        self.get_ready_backend(backend_type)?
            .ocr_pdf_page(pdf_path, page, dpi)
    }
}
