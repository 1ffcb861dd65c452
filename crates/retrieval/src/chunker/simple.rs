//! `simple` strategy: pack sentences into paragraphs up to `chunk_size`
//! characters; `overlap` only kicks in when a single sentence itself
//! exceeds `chunk_size` and character-based splitting takes over.

fn iter_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                j += 1;
            }
            if j > i + 1 {
                let para = text[start..i].trim();
                if !para.is_empty() {
                    paragraphs.push(para);
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        paragraphs.push(tail);
    }
    paragraphs
}

fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (idx, ch) = chars[i];
        if ch == '.' || ch == '!' || ch == '?' {
            let end = idx + ch.len_utf8();
            if chars.get(i + 1).map(|(_, c)| c.is_whitespace()).unwrap_or(true) {
                let s = paragraph[start..end].trim();
                if !s.is_empty() {
                    sentences.push(s);
                }
                start = end;
            }
        }
        i += 1;
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Returns `(text, start, end)` byte-offset spans into the source text.
pub fn chunk_simple(text: &str, chunk_size: usize, overlap: usize) -> Vec<(String, usize, usize)> {
    let chunk_size = chunk_size.max(1);
    let step = if overlap < chunk_size { chunk_size - overlap } else { chunk_size };

    let mut out = Vec::new();
    for para in iter_paragraphs(text) {
        let para_offset = para.as_ptr() as usize - text.as_ptr() as usize;
        let mut current = String::new();
        let mut current_start = para_offset;

        for sentence in split_sentences(para) {
            let sentence_offset = sentence.as_ptr() as usize - text.as_ptr() as usize;
            if sentence.len() > chunk_size {
                if !current.is_empty() {
                    let end = current_start + current.len();
                    out.push((std::mem::take(&mut current), current_start, end));
                }
                let mut i = 0;
                let bytes = sentence.as_bytes();
                while i < bytes.len() {
                    let end = (i + chunk_size).min(bytes.len());
                    let slice = char_boundary_slice(sentence, i, end);
                    out.push((slice.to_string(), sentence_offset + i, sentence_offset + i + slice.len()));
                    i += step;
                }
                current_start = sentence_offset + sentence.len();
                continue;
            }

            if current.is_empty() {
                current = sentence.to_string();
                current_start = sentence_offset;
            } else if current.len() + 1 + sentence.len() <= chunk_size {
                current.push(' ');
                current.push_str(sentence);
            } else {
                let end = current_start + current.len();
                out.push((std::mem::take(&mut current), current_start, end));
                current = sentence.to_string();
                current_start = sentence_offset;
            }
        }
        if !current.is_empty() {
            let end = current_start + current.len();
            out.push((current, current_start, end));
        }
    }
    out
}

fn char_boundary_slice(s: &str, mut start: usize, mut end: usize) -> &str {
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    while end < s.len() && !s.is_char_boundary(end) {
        end += 1;
    }
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_sentences_up_to_chunk_size() {
        let text = "One. Two. Three.\n\nFour.";
        let chunks = chunk_simple(text, 12, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, "One. Two.");
        assert_eq!(chunks[1].0, "Three.");
    }

    #[test]
    fn oversized_sentence_falls_back_to_character_splitting() {
        let text = "Aaaaaaaaaaaaaaaaaaaa.";
        let chunks = chunk_simple(text, 5, 1);
        assert!(chunks.len() > 1);
        for (c, _, _) in &chunks {
            assert!(c.len() <= 5);
        }
    }

    #[test]
    fn offsets_index_into_source_text() {
        let text = "One. Two.";
        let chunks = chunk_simple(text, 100, 0);
        assert_eq!(chunks.len(), 1);
        let (_, start, end) = &chunks[0];
        assert_eq!(&text[*start..*end], "One. Two.");
    }
}
