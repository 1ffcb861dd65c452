//! The document pipeline's ingest stages (C5-C11): classify an upload,
//! split scan-only PDFs into pages, route each page to text or OCR
//! extraction, and combine per-page text back into one document JSON.

mod classifier;
mod combine;
mod ids;
mod layout;
mod ocr_extractor;
mod office_extractor;
mod page_classifier;
mod pdf_text;
mod splitter;
mod text_extractor;

pub use classifier::ClassifierStage;
pub use combine::CombineStage;
pub use ocr_extractor::{requires_hocr, OcrExtractorStage};
pub use office_extractor::OfficeExtractorStage;
pub use page_classifier::PageClassifierStage;
pub use splitter::SplitterStage;
pub use text_extractor::TextExtractorStage;
