use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::corpus::chunker::chunk_document;
use crate::errors::AppError;
use crate::models::chunk::{Chunk, DocumentChunks, ScoredChunk, SourceDocument};
use crate::state::AppState;

const MAX_SEARCH_LIMIT: usize = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub documents: Vec<SourceDocument>,
    pub chunk_count: usize,
    /// Uploaded files that yielded no text.
    pub skipped: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<SourceDocument>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub grouped: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Flat { results: Vec<ScoredChunk> },
    Grouped { groups: Vec<DocumentChunks> },
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

fn is_pdf(file_name: &str, content_type: Option<&str>) -> bool {
    content_type == Some("application/pdf") || file_name.to_lowercase().ends_with(".pdf")
}

/// Plain text of one uploaded file. CPU-bound for PDFs: call from `spawn_blocking`.
fn extract_text(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> anyhow::Result<String> {
    if is_pdf(file_name, content_type) {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| anyhow::anyhow!("pdf extraction failed: {e}"))
    } else {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/corpus/scan
///
/// Multipart upload of PDFs and text files. Replaces the whole corpus and
/// invalidates the chunk index. Files that cannot be read are logged and skipped.
pub async fn handle_scan(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, AppError> {
    let mut documents: Vec<SourceDocument> = Vec::new();
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    let mut received = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", received + 1));
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read '{file_name}': {e}")))?;
        received += 1;

        let name = file_name.clone();
        // the PDF parser can panic on malformed input; a failed task counts as unreadable
        let extracted = tokio::task::spawn_blocking(move || {
            extract_text(&name, content_type.as_deref(), &bytes)
        })
        .await
        .unwrap_or_else(|e| Err(anyhow::anyhow!("extraction task failed: {e}")));

        let text = match extracted {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("No text found in '{file_name}', skipping");
                skipped.push(file_name);
                continue;
            }
            Err(e) => {
                warn!("Text extraction failed for '{file_name}': {e:#}");
                skipped.push(file_name);
                continue;
            }
        };

        let doc_id = Uuid::new_v4().to_string();
        let (document, doc_chunks) = chunk_document(&doc_id, &file_name, &text);
        info!(
            "Chunked '{}': {} chars into {} chunks",
            file_name, document.char_count, document.chunk_count
        );
        documents.push(document);
        chunks.extend(doc_chunks);
    }

    if received == 0 {
        return Err(AppError::Validation("no files uploaded".to_string()));
    }
    if chunks.is_empty() {
        return Err(AppError::Validation(
            "none of the uploaded files contained readable text".to_string(),
        ));
    }

    state.corpus.replace_corpus(&documents, &chunks).await?;
    state.index.invalidate();

    Ok(Json(ScanResponse {
        documents,
        chunk_count: chunks.len(),
        skipped,
    }))
}

/// GET /api/v1/corpus/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state.corpus.list_documents().await?;
    Ok(Json(DocumentListResponse { documents }))
}

/// GET /api/v1/corpus/search?q=&limit=&grouped=
///
/// Ranked chunks for a free-text query. `limit` is per document when grouped.
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let limit = params
        .limit
        .unwrap_or(state.config.default_chunk_limit)
        .clamp(1, MAX_SEARCH_LIMIT);

    let response = if params.grouped {
        SearchResponse::Grouped {
            groups: state.index.query_grouped_by_document(&params.q, limit).await,
        }
    } else {
        SearchResponse::Flat {
            results: state.index.query(&params.q, limit).await,
        }
    };
    Ok(Json(response))
}
