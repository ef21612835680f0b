use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS app_state (
    key TEXT PRIMARY KEY,
    value JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS source_documents (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    char_count INTEGER NOT NULL,
    chunk_count INTEGER NOT NULL,
    scanned_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS corpus_chunks (
    id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL REFERENCES source_documents(id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    ord INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_corpus_chunks_doc ON corpus_chunks(doc_id, ord);

CREATE TABLE IF NOT EXISTS generated_documents (
    id UUID PRIMARY KEY,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    content JSONB NOT NULL,
    metadata JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_generated_documents_created ON generated_documents(created_at DESC);
"#;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates any missing tables. Safe to run on every start.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in schema_statements() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("schema statement failed: {statement}"))?;
    }
    info!("Database schema ready");
    Ok(())
}

fn schema_statements() -> impl Iterator<Item = &'static str> {
    SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
