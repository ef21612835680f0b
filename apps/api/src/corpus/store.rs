use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::models::chunk::{Chunk, SourceDocument};

/// Persistent corpus of source documents and their chunks.
///
/// Carried in `AppState` as `Arc<dyn CorpusStore>`.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Every chunk, ordered by `(doc_id, order, id)`.
    async fn list_all_chunks(&self) -> Result<Vec<Chunk>>;

    async fn list_documents(&self) -> Result<Vec<SourceDocument>>;

    /// Replaces the whole corpus. Readers see either the old or the new corpus.
    async fn replace_corpus(&self, documents: &[SourceDocument], chunks: &[Chunk]) -> Result<()>;
}

pub struct PgCorpusStore {
    pool: PgPool,
}

impl PgCorpusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorpusStore for PgCorpusStore {
    async fn list_all_chunks(&self) -> Result<Vec<Chunk>> {
        let chunks = sqlx::query_as::<_, Chunk>(
            "SELECT id, doc_id, text, ord FROM corpus_chunks ORDER BY doc_id, ord, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load corpus chunks")?;
        Ok(chunks)
    }

    async fn list_documents(&self) -> Result<Vec<SourceDocument>> {
        let documents = sqlx::query_as::<_, SourceDocument>(
            "SELECT id, name, char_count, chunk_count, scanned_at
             FROM source_documents ORDER BY scanned_at DESC, name",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load source documents")?;
        Ok(documents)
    }

    async fn replace_corpus(&self, documents: &[SourceDocument], chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // chunks cascade with their documents
        sqlx::query("DELETE FROM source_documents")
            .execute(&mut *tx)
            .await?;

        for doc in documents {
            sqlx::query(
                "INSERT INTO source_documents (id, name, char_count, chunk_count, scanned_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&doc.id)
            .bind(&doc.name)
            .bind(doc.char_count)
            .bind(doc.chunk_count)
            .bind(doc.scanned_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert source document '{}'", doc.name))?;
        }

        for chunk in chunks {
            sqlx::query("INSERT INTO corpus_chunks (id, doc_id, text, ord) VALUES ($1, $2, $3, $4)")
                .bind(&chunk.id)
                .bind(&chunk.doc_id)
                .bind(&chunk.text)
                .bind(chunk.order)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to insert chunk '{}'", chunk.id))?;
        }

        tx.commit().await?;

        info!(
            "Corpus replaced: {} documents, {} chunks",
            documents.len(),
            chunks.len()
        );
        Ok(())
    }
}
