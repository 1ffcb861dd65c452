//! Core domain types shared across the IDP pipeline.

use serde::{Deserialize, Serialize};

/// Document type as determined by the Classifier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    Image,
}

impl DocumentType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "xlsx" => Some(Self::Xlsx),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Xlsx => "xlsx",
            Self::Image => "image",
        }
    }
}

/// Document audit status. Transitions are monotone forward except the
/// `Combined <-> MissingPages` self-loop while the Combine stage waits
/// for straggler pages. Office files and text-bearing PDFs skip straight
/// from `Uploaded` to `Combined`: the Office/Text Extractor writes
/// `text-docs/{doc}.json` directly, with no split or combine in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Uploaded,
    Split,
    Extracted,
    MissingPages,
    Combined,
    PiiDetected,
    RedactionStarted,
    RedactionError,
    Timeout,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Split => "SPLIT",
            Self::Extracted => "EXTRACTED",
            Self::MissingPages => "MISSING_PAGES",
            Self::Combined => "COMBINED",
            Self::PiiDetected => "PII_DETECTED",
            Self::RedactionStarted => "REDACTION_STARTED",
            Self::RedactionError => "REDACTION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "UPLOADED" => Self::Uploaded,
            "SPLIT" => Self::Split,
            "EXTRACTED" => Self::Extracted,
            "MISSING_PAGES" => Self::MissingPages,
            "COMBINED" => Self::Combined,
            "PII_DETECTED" => Self::PiiDetected,
            "REDACTION_STARTED" => Self::RedactionStarted,
            "REDACTION_ERROR" => Self::RedactionError,
            "TIMEOUT" => Self::Timeout,
            "FAILED" => Self::Failed,
            _ => return None,
        })
    }

    /// Whether `self -> next` is a legal audit transition (monotone forward,
    /// plus the documented `Combined`-stage self loop back to `MissingPages`).
    pub fn can_transition_to(self, next: Self) -> bool {
        use DocumentStatus::*;
        if next == Failed || next == Timeout {
            return true;
        }
        matches!(
            (self, next),
            (Uploaded, Split)
                | (Uploaded, Combined)
                | (Split, Extracted)
                | (Split, MissingPages)
                | (Extracted, MissingPages)
                | (Extracted, Combined)
                | (MissingPages, MissingPages)
                | (MissingPages, Combined)
                | (Combined, MissingPages)
                | (Combined, PiiDetected)
                | (PiiDetected, RedactionStarted)
                | (RedactionStarted, RedactionError)
        )
    }
}

/// A document known to the pipeline, identified by a stable `documentId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_key: String,
    pub doc_type: DocumentType,
    pub page_count: Option<u32>,
    pub status: DocumentStatus,
}

/// `{documentId, pages}` sentinel written last by the splitter/office extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub pages: u32,
}

/// Markdown text for a single page, with its `## Page N` header already applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub markdown: String,
}

impl PageText {
    pub fn render(page_number: u32, body: &str) -> String {
        format!("## Page {}\n\n{}\n", page_number, body.trim_end())
    }
}

/// Combined per-document text, `text-docs/{docId}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentText {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub page_count: u32,
    pub pages: Vec<String>,
}

/// A single recognized word with its bounding box, as produced by OCR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HocrWord {
    pub bbox: [f64; 4],
    pub text: String,
}

/// Per-page hOCR output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HocrPage {
    pub words: Vec<HocrWord>,
}

/// Per-document hOCR, `hocr/{docId}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hocr {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub pages: Vec<HocrPage>,
}

/// A detected span of personally-identifiable or sensitive text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Domain used to switch PII detection engines and regex sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Domain {
    #[default]
    Default,
    Medical,
    Legal,
}

impl Domain {
    /// Matches the source's `(event.get("domain") or event.get("classification") or "").title()` dispatch.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Medical" => Self::Medical,
            "Legal" => Self::Legal,
            _ => Self::Default,
        }
    }
}

/// Free-form metadata carried alongside a chunk or vector item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A chunk of text ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// An embedding plus its metadata, as stored by the Vector Store Proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A scored match returned from a vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// `(failures, last_failure)` per endpoint, used by the health-checked round robin.
#[derive(Debug, Clone, Default)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub failures: u32,
    pub last_failure_unix: Option<i64>,
}
