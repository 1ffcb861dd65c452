//! Rectangle painting: opaque white boxes over PDF content streams and
//! raster images, mirroring the source redaction Lambda's `_redact_pdf`
//! (PyMuPDF `draw_rect`) and `_redact_image` (Pillow `ImageDraw.rectangle`).

use std::collections::HashMap;

use image::{DynamicImage, ImageFormat, Rgba};
use lopdf::content::{Content, Operation};
use lopdf::{Document as PdfDocument, Object};

use idp_core::error::IdpError;

/// hOCR boxes are pixel coordinates at the DPI the page was rasterized for
/// OCR; PDF content-stream coordinates are points (72/inch) with the
/// origin at the bottom-left. `dpi` converts one to the other; the vertical
/// flip additionally needs the page's own height in points.
pub fn redact_pdf(bytes: &[u8], boxes_by_page: &HashMap<u32, Vec<[f64; 4]>>, dpi: f64) -> Result<Vec<u8>, IdpError> {
    let mut doc = PdfDocument::load_mem(bytes)
        .map_err(|e| IdpError::RedactionFailed(format!("malformed PDF: {e}")))?;
    let scale = 72.0 / dpi;

    for (page_number, object_id) in doc.get_pages() {
        let Some(boxes) = boxes_by_page.get(&page_number) else {
            continue;
        };
        if boxes.is_empty() {
            continue;
        }

        let page_height_pt = page_height_points(&doc, object_id);
        let mut operations = doc
            .get_page_content(object_id)
            .ok()
            .and_then(|bytes| Content::decode(&bytes).ok())
            .map(|c| c.operations)
            .unwrap_or_default();

        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new("rg", vec![1.0.into(), 1.0.into(), 1.0.into()]));
        for bbox in boxes {
            let (x, y, w, h) = pixel_bbox_to_pdf_rect(*bbox, scale, page_height_pt);
            operations.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
            operations.push(Operation::new("f", vec![]));
        }
        operations.push(Operation::new("Q", vec![]));

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| IdpError::RedactionFailed(format!("content stream encode: {e}")))?;
        doc.change_page_content(object_id, encoded)
            .map_err(|e| IdpError::RedactionFailed(format!("content stream write: {e}")))?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| IdpError::RedactionFailed(format!("PDF save: {e}")))?;
    Ok(out)
}

fn page_height_points(doc: &PdfDocument, object_id: (u32, u16)) -> f64 {
    doc.get_dictionary(object_id)
        .ok()
        .and_then(|dict| dict.get(b"MediaBox").ok())
        .and_then(|obj| obj.as_array().ok())
        .and_then(|media_box| media_box.get(3))
        .and_then(object_as_f64)
        .unwrap_or(792.0)
}

fn object_as_f64(obj: &Object) -> Option<f64> {
    obj.as_float()
        .map(|f| f as f64)
        .or_else(|_| obj.as_i64().map(|i| i as f64))
        .ok()
}

fn pixel_bbox_to_pdf_rect(bbox: [f64; 4], scale: f64, page_height_pt: f64) -> (f64, f64, f64, f64) {
    let [x1, y1, x2, y2] = bbox;
    let (x1, y1, x2, y2) = (x1 * scale, y1 * scale, x2 * scale, y2 * scale);
    let x = x1;
    let w = x2 - x1;
    let h = y2 - y1;
    let y = page_height_pt - y2;
    (x, y, w, h)
}

/// Paints `boxes` (already in image pixel coordinates, no DPI conversion)
/// white and re-encodes as PNG.
pub fn redact_image(bytes: &[u8], boxes: &[[f64; 4]]) -> Result<Vec<u8>, IdpError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| IdpError::RedactionFailed(format!("malformed image: {e}")))?;
    let mut buf = img.to_rgba8();
    let (width, height) = buf.dimensions();

    for bbox in boxes {
        let x1 = bbox[0].max(0.0) as u32;
        let y1 = bbox[1].max(0.0) as u32;
        let x2 = (bbox[2].max(0.0) as u32).min(width);
        let y2 = (bbox[3].max(0.0) as u32).min(height);
        for y in y1..y2 {
            for x in x1..x2 {
                buf.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }

    let mut out = Vec::new();
    DynamicImage::ImageRgba8(buf)
        .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| IdpError::RedactionFailed(format!("image encode: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_a_solid_png_without_error() {
        let mut img = image::RgbaImage::new(20, 20);
        for px in img.pixels_mut() {
            *px = Rgba([0, 0, 0, 255]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let redacted = redact_image(&bytes, &[[2.0, 2.0, 8.0, 8.0]]).unwrap();
        let decoded = image::load_from_memory(&redacted).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(4, 4), Rgba([255, 255, 255, 255]));
        assert_eq!(*decoded.get_pixel(15, 15), Rgba([0, 0, 0, 255]));
    }
}
