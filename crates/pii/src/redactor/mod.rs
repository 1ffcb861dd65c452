//! Redactor (C13): maps detected entity spans onto hOCR word boxes and
//! paints them out, for PDFs via content-stream rectangles, for images via
//! a raster fill. Mirrors the source `redact_file_lambda`'s dispatch on
//! file extension.

mod offsets;
mod paint;

pub use offsets::{build_offset_index, hocr_plain_text, map_entities_to_boxes};

use idp_core::error::IdpError;
use idp_core::models::{Entity, Hocr};

pub struct RedactionInput<'a> {
    pub source_bytes: &'a [u8],
    pub source_is_pdf: bool,
    pub hocr: &'a Hocr,
    pub entities: &'a [Entity],
    /// DPI the source pages were rasterized at for OCR; only consulted for
    /// the PDF path, which needs it to convert hOCR pixel boxes back to PDF
    /// points. Irrelevant for the image path (OCR ran on the same raster).
    pub dpi: f64,
}

/// Runs the full map-then-paint redaction for one document.
pub fn redact(input: RedactionInput) -> Result<Vec<u8>, IdpError> {
    let index = build_offset_index(input.hocr);
    let boxes_by_page = map_entities_to_boxes(&index, input.entities);

    if input.source_is_pdf {
        paint::redact_pdf(input.source_bytes, &boxes_by_page, input.dpi)
    } else {
        let page_boxes = boxes_by_page.get(&1).cloned().unwrap_or_default();
        paint::redact_image(input.source_bytes, &page_boxes)
    }
}
