use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    CoverLetter,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::CoverLetter => "cover_letter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resume" => Some(DocumentKind::Resume),
            "cover_letter" => Some(DocumentKind::CoverLetter),
            _ => None,
        }
    }
}

/// A generated resume or cover letter kept in the history list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub title: String,
    /// Structured resume JSON, or `{"letter": "..."}` for cover letters.
    pub content: Value,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GeneratedDocumentRow {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub content: Value,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<GeneratedDocumentRow> for GeneratedDocument {
    type Error = anyhow::Error;

    fn try_from(row: GeneratedDocumentRow) -> Result<Self, Self::Error> {
        let kind = DocumentKind::parse(&row.kind)
            .ok_or_else(|| anyhow::anyhow!("unknown document kind '{}'", row.kind))?;
        Ok(GeneratedDocument {
            id: row.id,
            kind,
            title: row.title,
            content: row.content,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}
