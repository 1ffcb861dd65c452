//! Local OCR backends: EasyOCR, PaddleOCR, and ocrmypdf.
//!
//! EasyOCR and PaddleOCR are CNN-based readers normally driven from Python;
//! here they're modeled as command-line tools (a thin wrapper script or
//! container entrypoint named `easyocr`/`paddleocr` on `PATH`) so the
//! backend shape matches `OcrMyPdfBackend` and the corpus's own
//! command-line-tool OCR backends. `OcrMyPdfBackend` additionally parses
//! the hOCR file `ocrmypdf` writes alongside its text output, matching
//! the word-box regex the source extractor uses.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use idp_core::models::{HocrPage, HocrWord};

use super::backend::{BackendConfig, OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_utils::check_binary;

/// Shared shape for a CLI-tool-backed OCR engine invoked as
/// `<binary> <image> <language>`, writing recognized text to stdout.
struct CliOcrBackend {
    binary: &'static str,
    config: BackendConfig,
}

impl CliOcrBackend {
    fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(self.binary)
            .arg(image_path)
            .args(["--lang", &self.config.ocr.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!(
                    "{} failed: {}",
                    self.binary, stderr
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(format!("{} not found on PATH", self.binary)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

pub struct EasyOcrBackend {
    inner: CliOcrBackend,
}

impl EasyOcrBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            inner: CliOcrBackend {
                binary: "easyocr",
                config: BackendConfig::with_config(config),
            },
        }
    }
}

impl Default for EasyOcrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for EasyOcrBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::EasyOcr
    }

    fn is_available(&self) -> bool {
        check_binary(self.inner.binary)
    }

    fn availability_hint(&self) -> String {
        "easyocr not found on PATH. Install the easyocr CLI wrapper.".to_string()
    }

    fn run_ocr(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError> {
        Ok((self.inner.run(image_path)?, None))
    }
}

pub struct PaddleOcrBackend {
    inner: CliOcrBackend,
}

impl PaddleOcrBackend {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            inner: CliOcrBackend {
                binary: "paddleocr",
                config: BackendConfig::with_config(config),
            },
        }
    }
}

impl Default for PaddleOcrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for PaddleOcrBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::PaddleOcr
    }

    fn is_available(&self) -> bool {
        check_binary(self.inner.binary)
    }

    fn availability_hint(&self) -> String {
        "paddleocr not found on PATH. Install the paddleocr CLI wrapper.".to_string()
    }

    fn run_ocr(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError> {
        Ok((self.inner.run(image_path)?, None))
    }
}

/// ocrmypdf wraps Tesseract and, with `--sidecar`, writes a plain-text
/// transcript plus an hOCR file we parse for word boxes.
pub struct OcrMyPdfBackend {
    config: BackendConfig,
}

impl OcrMyPdfBackend {
    pub fn new() -> Self {
        Self {
            config: BackendConfig::new(),
        }
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self {
            config: BackendConfig::with_config(config),
        }
    }

    fn run_impl(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError> {
        let temp_dir = tempfile::TempDir::new()?;
        let pdf_out = temp_dir.path().join("out.pdf");
        let sidecar = temp_dir.path().join("out.txt");
        let hocr_out = temp_dir.path().join("out.hocr");

        let status = Command::new("ocrmypdf")
            .args(["--image-dpi", "300", "--sidecar"])
            .arg(&sidecar)
            .args(["--output-type", "pdf"])
            .args(["-l", &self.config.ocr.language])
            .arg("--force-ocr")
            .arg(image_path)
            .arg(&pdf_out)
            .status();

        match status {
            Ok(s) if s.success() => {}
            Ok(_) => return Err(OcrError::OcrFailed("ocrmypdf failed".to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(
                    "ocrmypdf not found (pip install ocrmypdf)".to_string(),
                ))
            }
            Err(e) => return Err(OcrError::Io(e)),
        }

        let text = std::fs::read_to_string(&sidecar).unwrap_or_default();
        let hocr = std::fs::read_to_string(&hocr_out)
            .ok()
            .map(|html| parse_hocr_words(&html));

        Ok((text, hocr))
    }
}

impl Default for OcrMyPdfBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for OcrMyPdfBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::OcrMyPdf
    }

    fn is_available(&self) -> bool {
        check_binary("ocrmypdf")
    }

    fn availability_hint(&self) -> String {
        "ocrmypdf not found. Install with: pip install ocrmypdf".to_string()
    }

    fn run_ocr(&self, image_path: &Path) -> Result<(String, Option<HocrPage>), OcrError> {
        self.run_impl(image_path)
    }
}

/// Parses `ocrx_word` spans out of an hOCR document, matching the
/// `<span class="ocrx_word" title="... bbox x1 y1 x2 y2 ...">text</span>`
/// shape ocrmypdf/Tesseract emit.
fn parse_hocr_words(hocr_html: &str) -> HocrPage {
    let re = regex::Regex::new(
        r#"(?is)<span[^>]*class=['"]ocrx_word['"][^>]*title=['"][^'"]*bbox (\d+) (\d+) (\d+) (\d+)[^'"]*['"][^>]*>(.*?)</span>"#,
    )
    .expect("static hOCR word regex is valid");

    let tag_re = regex::Regex::new(r"<[^>]+>").expect("static tag-strip regex is valid");

    let words = re
        .captures_iter(hocr_html)
        .filter_map(|c| {
            let x1: f64 = c.get(1)?.as_str().parse().ok()?;
            let y1: f64 = c.get(2)?.as_str().parse().ok()?;
            let x2: f64 = c.get(3)?.as_str().parse().ok()?;
            let y2: f64 = c.get(4)?.as_str().parse().ok()?;
            let raw_text = c.get(5)?.as_str();
            let text = tag_re.replace_all(raw_text, "").trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(HocrWord {
                bbox: [x1, y1, x2, y2],
                text,
            })
        })
        .collect();

    HocrPage { words }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hocr_word_spans() {
        let hocr = r#"<span class="ocrx_word" title="bbox 10 20 50 40; x_wconf 95">Hello</span>
                       <span class="ocrx_word" title="bbox 60 20 90 40; x_wconf 91">world</span>"#;
        let page = parse_hocr_words(hocr);
        assert_eq!(page.words.len(), 2);
        assert_eq!(page.words[0].text, "Hello");
        assert_eq!(page.words[0].bbox, [10.0, 20.0, 50.0, 40.0]);
        assert_eq!(page.words[1].text, "world");
    }

    #[test]
    fn ignores_non_word_spans() {
        let hocr = r#"<span class="ocr_line" title="bbox 0 0 100 20">line text</span>"#;
        let page = parse_hocr_words(hocr);
        assert!(page.words.is_empty());
    }
}
