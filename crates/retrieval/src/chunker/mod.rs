//! Chunker (C14): paragraph/sentence packing (`simple`) or extension-aware
//! token-counted splitting (`universal`), with a per-doctype strategy map.

mod simple;
mod universal;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use idp_pii::detector::{NerBackend, RegexNerBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Simple,
    Universal,
}

impl ChunkStrategy {
    fn parse(raw: &str) -> Self {
        match raw {
            "universal" => Self::Universal,
            _ => Self::Simple,
        }
    }
}

/// Carries through docType, file identifiers, and tenant fields per §4.14;
/// `text` duplicates the chunk's own text so the Vector Store Proxy and
/// Retrieval Orchestrator can read it back off a search match's metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(rename = "docType", skip_serializing_if = "Option::is_none")]
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkRequest {
    pub doc_type: Option<String>,
    pub file_guid: Option<String>,
    pub file_name: Option<String>,
    pub department: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub strategy: Option<String>,
    pub extract_entities: bool,
}

pub struct Chunker {
    default_strategy: ChunkStrategy,
    strategy_map: HashMap<String, ChunkStrategy>,
    ner: Box<dyn NerBackend>,
}

impl Chunker {
    pub fn new(default_strategy: &str, strategy_map: HashMap<String, String>) -> Self {
        Self {
            default_strategy: ChunkStrategy::parse(default_strategy),
            strategy_map: strategy_map
                .into_iter()
                .map(|(k, v)| (k, ChunkStrategy::parse(&v)))
                .collect(),
            ner: Box::new(RegexNerBackend::new()),
        }
    }

    fn resolve_strategy(&self, req: &ChunkRequest) -> ChunkStrategy {
        if let Some(explicit) = &req.strategy {
            return ChunkStrategy::parse(explicit);
        }
        req.doc_type
            .as_ref()
            .and_then(|t| self.strategy_map.get(t))
            .copied()
            .unwrap_or(self.default_strategy)
    }

    pub fn chunk(&self, text: &str, req: &ChunkRequest) -> Vec<Chunk> {
        let strategy = self.resolve_strategy(req);
        let mut spans = match strategy {
            ChunkStrategy::Simple => simple::chunk_simple(text, req.chunk_size, req.chunk_overlap),
            ChunkStrategy::Universal => universal::chunk_universal(
                text,
                req.file_name.as_deref(),
                req.chunk_size,
                req.chunk_overlap,
            ),
        };

        spans
            .drain(..)
            .map(|(chunk_text, start, end)| {
                let entities = if req.extract_entities {
                    let found = self.ner.extract(&chunk_text).entities;
                    if found.is_empty() {
                        None
                    } else {
                        Some(found.into_iter().map(|e| e.text).collect())
                    }
                } else {
                    None
                };
                Chunk {
                    metadata: ChunkMetadata {
                        doc_type: req.doc_type.clone(),
                        file_guid: req.file_guid.clone(),
                        file_name: req.file_name.clone(),
                        department: req.department.clone(),
                        team: req.team.clone(),
                        user: req.user.clone(),
                        entities,
                        text: Some(chunk_text.clone()),
                    },
                    text: chunk_text,
                    start,
                    end,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_simple_and_carries_metadata() {
        let chunker = Chunker::new("simple", HashMap::new());
        let req = ChunkRequest {
            doc_type: Some("memo".to_string()),
            file_guid: Some("abc-123".to_string()),
            chunk_size: 1000,
            chunk_overlap: 100,
            ..Default::default()
        };
        let chunks = chunker.chunk("Hello world. This is a memo.", &req);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.doc_type.as_deref(), Some("memo"));
        assert_eq!(chunks[0].metadata.file_guid.as_deref(), Some("abc-123"));
        assert_eq!(chunks[0].metadata.text.as_deref(), Some(chunks[0].text.as_str()));
    }

    #[test]
    fn strategy_map_overrides_default_by_doc_type() {
        let mut map = HashMap::new();
        map.insert("code".to_string(), "universal".to_string());
        let chunker = Chunker::new("simple", map);
        let req = ChunkRequest {
            doc_type: Some("code".to_string()),
            chunk_size: 5,
            chunk_overlap: 0,
            file_name: Some("main.py".to_string()),
            ..Default::default()
        };
        let chunks = chunker.chunk("def add(a, b):\n    return a + b\n", &req);
        assert!(chunks.len() > 1);
    }
}
