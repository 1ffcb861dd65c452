//! `documentId` assignment (Open Question #2, decided in DESIGN.md): derived
//! once by the Classifier from the uploaded key's basename stem, falling
//! back to a UUIDv4 when the stem is empty or not filesystem-safe. Every
//! downstream prefix reuses this value unchanged.

use uuid::Uuid;

pub fn document_id_from_key(key: &str) -> String {
    let stem = key
        .rsplit('/')
        .next()
        .unwrap_or(key)
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(key);

    let sanitized: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if sanitized.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        sanitized
    }
}

pub fn extension_of(key: &str) -> Option<String> {
    key.rsplit('/')
        .next()
        .unwrap_or(key)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_stem_from_nested_key() {
        assert_eq!(document_id_from_key("raw/folder/report.pdf"), "report");
    }

    #[test]
    fn falls_back_to_uuid_on_empty_stem() {
        let id = document_id_from_key("raw/.pdf");
        assert_eq!(id.len(), 36);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("raw/a.PDF"), Some("pdf".to_string()));
    }
}
