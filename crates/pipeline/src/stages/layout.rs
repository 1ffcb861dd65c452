//! Shared layout-reconstruction algorithm (§4.8), used by both the Text
//! Extractor (C8, on embedded PDF boxes) and the OCR Extractor (C9, on
//! recognized word boxes) so a page looks the same in the output regardless
//! of which stage produced its text.
//!
//! Boxes are grouped into lines by vertical proximity, lines into paragraphs
//! by vertical gap, and lines carrying two or more boxes are treated as
//! table rows and rendered as a Markdown table.

/// A positioned run of text, in PDF/image space (origin top-left, y growing
/// downward — callers normalize whatever coordinate system their source
/// uses before building these).
#[derive(Debug, Clone)]
pub struct TextBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub text: String,
}

impl TextBox {
    fn height(&self) -> f64 {
        (self.y1 - self.y0).abs().max(1.0)
    }

    fn y_center(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }
}

struct Line {
    boxes: Vec<TextBox>,
    top: f64,
    bottom: f64,
}

impl Line {
    fn is_table_row(&self) -> bool {
        self.boxes.len() >= 2
    }

    fn text(&self) -> String {
        self.boxes
            .iter()
            .map(|b| b.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn cells(&self) -> Vec<String> {
        self.boxes.iter().map(|b| b.text.trim().to_string()).collect()
    }
}

fn median_height(boxes: &[TextBox]) -> f64 {
    if boxes.is_empty() {
        return 10.0;
    }
    let mut heights: Vec<f64> = boxes.iter().map(TextBox::height).collect();
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap());
    heights[heights.len() / 2]
}

fn group_into_lines(mut boxes: Vec<TextBox>, line_height_threshold: f64) -> Vec<Line> {
    boxes.sort_by(|a, b| {
        b.y_center()
            .partial_cmp(&a.y_center())
            .unwrap()
            .then(a.x0.partial_cmp(&b.x0).unwrap())
    });

    let mut lines: Vec<Line> = Vec::new();
    for b in boxes {
        if let Some(last) = lines.last_mut() {
            let last_center = (last.top + last.bottom) / 2.0;
            if (last_center - b.y_center()).abs() <= line_height_threshold {
                last.top = last.top.max(b.y0.max(b.y1));
                last.bottom = last.bottom.min(b.y0.min(b.y1));
                last.boxes.push(b);
                continue;
            }
        }
        lines.push(Line {
            top: b.y0.max(b.y1),
            bottom: b.y0.min(b.y1),
            boxes: vec![b],
        });
    }

    for line in &mut lines {
        line.boxes.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap());
    }

    lines
}

fn render_table(rows: &[&Line]) -> String {
    let cols = rows.iter().map(|r| r.cells().len()).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.cells();
        cells.resize(cols, String::new());
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
        if i == 0 {
            out.push('|');
            for _ in 0..cols {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out
}

/// Reconstructs Markdown body text from a page's text boxes: lines by
/// vertical proximity, paragraphs by vertical gap, table rows rendered as
/// Markdown tables.
pub fn reconstruct_markdown(boxes: Vec<TextBox>) -> String {
    if boxes.is_empty() {
        return String::new();
    }
    let median_h = median_height(&boxes);
    let line_threshold = median_h * 0.6;
    let paragraph_gap = median_h * 1.5;

    let lines = group_into_lines(boxes, line_threshold);
    if lines.is_empty() {
        return String::new();
    }

    let mut blocks: Vec<String> = Vec::new();
    let mut current_text_lines: Vec<&Line> = Vec::new();
    let mut current_table_rows: Vec<&Line> = Vec::new();
    let mut prev_bottom: Option<f64> = None;

    let flush_text = |lines: &mut Vec<&Line>, blocks: &mut Vec<String>| {
        if !lines.is_empty() {
            let joined = lines
                .iter()
                .map(|l| l.text())
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(joined);
            lines.clear();
        }
    };
    let flush_table = |rows: &mut Vec<&Line>, blocks: &mut Vec<String>| {
        if !rows.is_empty() {
            blocks.push(render_table(rows));
            rows.clear();
        }
    };

    for line in &lines {
        if let Some(bottom) = prev_bottom {
            if (bottom - line.top).abs() > paragraph_gap {
                flush_text(&mut current_text_lines, &mut blocks);
                flush_table(&mut current_table_rows, &mut blocks);
            }
        }

        if line.is_table_row() {
            flush_text(&mut current_text_lines, &mut blocks);
            current_table_rows.push(line);
        } else {
            flush_table(&mut current_table_rows, &mut blocks);
            current_text_lines.push(line);
        }

        prev_bottom = Some(line.bottom);
    }
    flush_text(&mut current_text_lines, &mut blocks);
    flush_table(&mut current_table_rows, &mut blocks);

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tb(x0: f64, y: f64, x1: f64, text: &str) -> TextBox {
        TextBox {
            x0,
            y0: y,
            x1,
            y1: y + 10.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn groups_same_line_words_together() {
        let boxes = vec![tb(0.0, 100.0, 20.0, "Hello"), tb(25.0, 100.0, 50.0, "world")];
        let md = reconstruct_markdown(boxes);
        assert_eq!(md, "Hello world");
    }

    #[test]
    fn separates_paragraphs_on_large_gap() {
        let boxes = vec![tb(0.0, 100.0, 20.0, "Para1"), tb(0.0, 50.0, 20.0, "Para2")];
        let md = reconstruct_markdown(boxes);
        assert_eq!(md, "Para1\n\nPara2");
    }

    #[test]
    fn renders_two_column_line_as_table() {
        let boxes = vec![
            tb(0.0, 100.0, 20.0, "Name"),
            tb(40.0, 100.0, 60.0, "Age"),
            tb(0.0, 88.0, 20.0, "Alice"),
            tb(40.0, 88.0, 60.0, "30"),
        ];
        let md = reconstruct_markdown(boxes);
        assert!(md.contains("| Name | Age |"));
        assert!(md.contains("| --- | --- |"));
        assert!(md.contains("| Alice | 30 |"));
    }
}
