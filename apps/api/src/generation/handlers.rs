//! Axum route handlers for the Generation API.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::composer::CompositionMode;
use crate::generation::generator::{
    generate_cover_letter, generate_resume, GenerationMetadata, GenerationRequest,
};
use crate::generation::history::{resume_title, COVER_LETTER_TITLE, HISTORY_LIMIT};
use crate::llm_client::Availability;
use crate::models::document::{DocumentKind, GeneratedDocument};
use crate::models::profile::CandidateProfile;
use crate::models::resume::StructuredResume;
use crate::state::AppState;

const MAX_CHUNK_LIMIT: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Body of both generation endpoints. Anything omitted falls back to the
/// stored job description and profile, then to the service defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub job_description: Option<String>,
    pub mode: Option<CompositionMode>,
    pub profile: Option<CandidateProfile>,
    pub chunk_limit: Option<usize>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ResumeResponse {
    pub document_id: Uuid,
    pub resume: StructuredResume,
    pub generated_title: Option<String>,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResponse {
    pub document_id: Uuid,
    pub letter: String,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<GeneratedDocument>,
}

/// Job text and profile after applying request overrides over stored state.
struct ResolvedInputs {
    job_description: String,
    profile: Option<CandidateProfile>,
    mode: CompositionMode,
    chunk_limit: usize,
}

impl GenerateRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(AppError::Validation(
                    "temperature must be between 0.0 and 2.0".to_string(),
                ));
            }
        }
        if self.top_k == Some(0) {
            return Err(AppError::Validation("top_k must be at least 1".to_string()));
        }
        if let Some(limit) = self.chunk_limit {
            if !(1..=MAX_CHUNK_LIMIT).contains(&limit) {
                return Err(AppError::Validation(format!(
                    "chunk_limit must be between 1 and {MAX_CHUNK_LIMIT}"
                )));
            }
        }
        Ok(())
    }

    async fn resolve(&mut self, state: &AppState) -> Result<ResolvedInputs, AppError> {
        let job_description = match self.job_description.take().filter(|j| !j.trim().is_empty()) {
            Some(job) => job,
            None => state
                .context
                .get_job_description()
                .await?
                .filter(|job| !job.is_blank())
                .map(|job| job.text)
                .unwrap_or_default(),
        };

        let mode = self.mode.unwrap_or_default();
        let profile = match (self.profile.take(), mode) {
            (Some(profile), _) => Some(profile),
            (None, CompositionMode::Profile) => state.context.get_candidate_profile().await?,
            (None, CompositionMode::Corpus) => None,
        };

        Ok(ResolvedInputs {
            job_description,
            profile,
            mode,
            chunk_limit: self.chunk_limit.unwrap_or(state.config.default_chunk_limit),
        })
    }
}

impl ResolvedInputs {
    fn as_request<'a>(&'a self, body: &GenerateRequest) -> GenerationRequest<'a> {
        GenerationRequest {
            job_description: &self.job_description,
            mode: self.mode,
            profile: self.profile.as_ref(),
            chunk_limit: self.chunk_limit,
            temperature: body.temperature,
            top_k: body.top_k,
        }
    }
}

/// Saves a generated document. A history failure is logged and does not fail
/// the request: the caller still gets the generated content.
async fn record(state: &AppState, document: GeneratedDocument) -> Uuid {
    let id = document.id;
    if let Err(e) = state.history.save(&document).await {
        error!("Failed to save {} to history: {e:#}", document.kind.as_str());
    }
    id
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generate/resume
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    Json(mut body): Json<GenerateRequest>,
) -> Result<Json<ResumeResponse>, AppError> {
    body.validate()?;
    let inputs = body.resolve(&state).await?;

    info!(
        "Generating resume ({:?} mode, chunk limit {})",
        inputs.mode, inputs.chunk_limit
    );
    let generation =
        generate_resume(&state.index, state.model.as_ref(), &inputs.as_request(&body)).await?;

    let document = GeneratedDocument {
        id: Uuid::new_v4(),
        kind: DocumentKind::Resume,
        title: resume_title(generation.generated_title.as_deref(), &generation.resume),
        content: serde_json::to_value(&generation.resume).map_err(anyhow::Error::from)?,
        metadata: serde_json::to_value(&generation.metadata).map_err(anyhow::Error::from)?,
        created_at: Utc::now(),
    };
    let document_id = record(&state, document).await;

    Ok(Json(ResumeResponse {
        document_id,
        resume: generation.resume,
        generated_title: generation.generated_title,
        metadata: generation.metadata,
    }))
}

/// POST /api/v1/generate/cover-letter
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Json(mut body): Json<GenerateRequest>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    body.validate()?;
    let inputs = body.resolve(&state).await?;

    info!(
        "Generating cover letter ({:?} mode, chunk limit {})",
        inputs.mode, inputs.chunk_limit
    );
    let generation =
        generate_cover_letter(&state.index, state.model.as_ref(), &inputs.as_request(&body))
            .await?;

    let document = GeneratedDocument {
        id: Uuid::new_v4(),
        kind: DocumentKind::CoverLetter,
        title: COVER_LETTER_TITLE.to_string(),
        content: json!({ "letter": generation.letter }),
        metadata: serde_json::to_value(&generation.metadata).map_err(anyhow::Error::from)?,
        created_at: Utc::now(),
    };
    let document_id = record(&state, document).await;

    Ok(Json(CoverLetterResponse {
        document_id,
        letter: generation.letter,
        metadata: generation.metadata,
    }))
}

/// GET /api/v1/model/availability
pub async fn handle_model_availability(
    State(state): State<AppState>,
) -> Result<Json<Availability>, AppError> {
    Ok(Json(state.model.availability().await?))
}

/// GET /api/v1/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state.history.list_recent(HISTORY_LIMIT).await?;
    Ok(Json(DocumentListResponse { documents }))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedDocument>, AppError> {
    let document = state
        .history
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;
    Ok(Json(document))
}
