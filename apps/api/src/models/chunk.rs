use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A retrievable excerpt of candidate-qualification text tied to a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Chunk {
    pub id: String,
    pub doc_id: String,
    pub text: String,
    /// Position within the source document. Only used as a stable grouping aid.
    #[sqlx(rename = "ord")]
    pub order: i32,
}

/// A chunk ranked against a query. `score` is the raw term-frequency dot product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub doc_id: String,
    pub text: String,
    pub order: i32,
    pub score: f64,
}

/// Query results bucketed by source document, in first-seen order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunks {
    pub doc_id: String,
    pub chunks: Vec<ScoredChunk>,
}

/// A scanned source file (PDF or plain text) that chunks were cut from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    pub char_count: i32,
    pub chunk_count: i32,
    pub scanned_at: DateTime<Utc>,
}
