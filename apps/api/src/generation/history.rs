use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::document::{GeneratedDocument, GeneratedDocumentRow};
use crate::models::resume::StructuredResume;

/// Number of generated documents kept and listed.
pub const HISTORY_LIMIT: usize = 20;

pub const COVER_LETTER_TITLE: &str = "Cover Letter generated";

/// History title for a resume: the model's `title::` line, else the candidate
/// name, else a generic label.
pub fn resume_title(generated_title: Option<&str>, resume: &StructuredResume) -> String {
    if let Some(title) = generated_title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    match resume.header.full_name.trim() {
        "" => "Resume generated".to_string(),
        name => format!("{name} - Resume"),
    }
}

/// Generated resumes and cover letters, newest first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(&self, document: &GeneratedDocument) -> Result<()>;
    async fn list_recent(&self, limit: usize) -> Result<Vec<GeneratedDocument>>;
    async fn get(&self, id: Uuid) -> Result<Option<GeneratedDocument>>;
}

pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn save(&self, document: &GeneratedDocument) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO generated_documents (id, kind, title, content, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(document.id)
        .bind(document.kind.as_str())
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.metadata)
        .bind(document.created_at)
        .execute(&mut *tx)
        .await
        .context("failed to insert generated document")?;

        // keep only the most recent entries
        let pruned = sqlx::query(
            "DELETE FROM generated_documents WHERE id NOT IN (
                SELECT id FROM generated_documents ORDER BY created_at DESC LIMIT $1
             )",
        )
        .bind(HISTORY_LIMIT as i64)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        info!(
            "Saved {} '{}' ({} older entries pruned)",
            document.kind.as_str(),
            document.title,
            pruned
        );
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<GeneratedDocument>> {
        let rows = sqlx::query_as::<_, GeneratedDocumentRow>(
            "SELECT id, kind, title, content, metadata, created_at
             FROM generated_documents ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("failed to list generated documents")?;

        rows.into_iter().map(GeneratedDocument::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<GeneratedDocument>> {
        let row = sqlx::query_as::<_, GeneratedDocumentRow>(
            "SELECT id, kind, title, content, metadata, created_at
             FROM generated_documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load generated document")?;

        row.map(GeneratedDocument::try_from).transpose()
    }
}
