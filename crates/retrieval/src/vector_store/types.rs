use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Matches the shape the reference vector-database client passes around:
/// an optional server-assigned id, the embedding, and an opaque metadata
/// bag (carries `ChunkMetadata`'s fields plus whatever else a caller adds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}
