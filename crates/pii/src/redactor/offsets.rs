//! Offset index: maps character offsets into a document's plain text back
//! to the hOCR word box that produced them, by walking hOCR in document
//! order — each word consumes `len(text) + 1` offsets (a separator), each
//! page adds one more (a newline). Mirrors the source redaction Lambda's
//! `_iter_words`/`_map_boxes`.

use std::collections::HashMap;

use idp_core::models::{Entity, Hocr};

/// Reconstructs the plain text an hOCR document's offset index is defined
/// over: words space-separated, pages newline-separated. The PII Detector
/// must run over this exact same text for a scanned document so its
/// entity offsets land on the index built here — not over the
/// layout-reconstructed markdown, which doesn't share byte offsets with it.
pub fn hocr_plain_text(hocr: &Hocr) -> String {
    let mut out = String::new();
    for page in &hocr.pages {
        for word in &page.words {
            out.push_str(&word.text);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// `offset -> (page_number, bbox)`, 1-indexed pages in hOCR order.
pub fn build_offset_index(hocr: &Hocr) -> HashMap<usize, (u32, [f64; 4])> {
    let mut index = HashMap::new();
    let mut offset = 0usize;
    for (page_idx, page) in hocr.pages.iter().enumerate() {
        let page_number = (page_idx + 1) as u32;
        for word in &page.words {
            if !word.text.is_empty() {
                for i in 0..word.text.len() {
                    index.insert(offset + i, (page_number, word.bbox));
                }
            }
            offset += word.text.len() + 1;
        }
        offset += 1;
    }
    index
}

/// Maps each entity's `[start, end)` span to the set of `(page, bbox)`
/// boxes it touches, deduping identical boxes within a page. Offsets
/// outside hOCR coverage (born-digital text with no OCR pass) map to
/// nothing, per the no-coverage invariant.
pub fn map_entities_to_boxes(
    index: &HashMap<usize, (u32, [f64; 4])>,
    entities: &[Entity],
) -> HashMap<u32, Vec<[f64; 4]>> {
    let mut pages: HashMap<u32, Vec<[f64; 4]>> = HashMap::new();
    for entity in entities {
        for offset in entity.start..entity.end {
            if let Some((page, bbox)) = index.get(&offset) {
                let boxes = pages.entry(*page).or_default();
                if !boxes.contains(bbox) {
                    boxes.push(*bbox);
                }
            }
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use idp_core::models::HocrPage;
    use idp_core::models::HocrWord;

    fn word(text: &str, bbox: [f64; 4]) -> HocrWord {
        HocrWord {
            text: text.to_string(),
            bbox,
        }
    }

    #[test]
    fn maps_entity_span_to_its_word_boxes() {
        let hocr = Hocr {
            document_id: "doc".to_string(),
            pages: vec![HocrPage {
                words: vec![
                    word("Call", [0.0, 0.0, 10.0, 5.0]),
                    word("Alice", [12.0, 0.0, 20.0, 5.0]),
                    word("at", [22.0, 0.0, 25.0, 5.0]),
                    word("555-12-3456", [27.0, 0.0, 50.0, 5.0]),
                ],
            }],
        };
        let text = hocr_plain_text(&hocr);
        assert_eq!(text, "Call Alice at 555-12-3456 \n");

        let alice_start = text.find("Alice").unwrap();
        let ssn_start = text.find("555-12-3456").unwrap();
        let entities = vec![
            Entity {
                text: "Alice".to_string(),
                entity_type: "PERSON".to_string(),
                start: alice_start,
                end: alice_start + "Alice".len(),
                score: None,
            },
            Entity {
                text: "555-12-3456".to_string(),
                entity_type: "SSN".to_string(),
                start: ssn_start,
                end: ssn_start + "555-12-3456".len(),
                score: None,
            },
        ];

        let index = build_offset_index(&hocr);
        let boxes = map_entities_to_boxes(&index, &entities);
        let page_boxes = boxes.get(&1).unwrap();
        assert!(page_boxes.contains(&[12.0, 0.0, 20.0, 5.0]));
        assert!(page_boxes.contains(&[27.0, 0.0, 50.0, 5.0]));
        assert_eq!(page_boxes.len(), 2);
    }

    #[test]
    fn offsets_outside_hocr_coverage_map_to_nothing() {
        let hocr = Hocr {
            document_id: "doc".to_string(),
            pages: vec![],
        };
        let index = build_offset_index(&hocr);
        let entities = vec![Entity {
            text: "SSN".to_string(),
            entity_type: "SSN".to_string(),
            start: 0,
            end: 11,
            score: None,
        }];
        let boxes = map_entities_to_boxes(&index, &entities);
        assert!(boxes.is_empty());
    }

    #[test]
    fn duplicate_boxes_within_a_page_are_deduped() {
        let hocr = Hocr {
            document_id: "doc".to_string(),
            pages: vec![HocrPage {
                words: vec![word("Alice", [1.0, 1.0, 2.0, 2.0])],
            }],
        };
        let index = build_offset_index(&hocr);
        let entities = vec![Entity {
            text: "Alice".to_string(),
            entity_type: "PERSON".to_string(),
            start: 0,
            end: 5,
            score: None,
        }];
        let boxes = map_entities_to_boxes(&index, &entities);
        assert_eq!(boxes.get(&1).unwrap().len(), 1);
    }
}
