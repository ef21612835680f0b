use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Generation errors
// ────────────────────────────────────────────────────────────────────────────

/// Failure classes of the generation pipeline. The orchestrator decides whether
/// to retry by matching on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingInput,
    NoContext,
    BudgetExceeded,
    EmptyResponse,
    MalformedJson,
    ProviderTransient,
    Provider,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::EmptyResponse | ErrorKind::ProviderTransient)
    }
}

/// Errors raised while composing, generating, or decoding a document.
///
/// `Display` is always a single sentence suitable for showing to the user.
/// Parser and provider details are kept in `detail` fields for logging only.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    NoContext(String),

    #[error("The prompt is still too large for the on-device model ({total_tokens} of {limit} tokens). Shorten the job description and try again.")]
    BudgetExceeded { total_tokens: usize, limit: usize },

    #[error("The on-device model returned an empty response. Try again.")]
    EmptyResponse,

    #[error("The model response could not be read as a resume. Try generating again.")]
    MalformedJson { detail: String },

    #[error("The on-device model is busy or unavailable. Try again in a moment.")]
    ProviderTransient { detail: String },

    #[error("The on-device model rejected the request. Check that it is installed and enabled.")]
    Provider { detail: String },
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::MissingInput(_) => ErrorKind::MissingInput,
            GenerationError::NoContext(_) => ErrorKind::NoContext,
            GenerationError::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            GenerationError::EmptyResponse => ErrorKind::EmptyResponse,
            GenerationError::MalformedJson { .. } => ErrorKind::MalformedJson,
            GenerationError::ProviderTransient { .. } => ErrorKind::ProviderTransient,
            GenerationError::Provider { .. } => ErrorKind::Provider,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Internal detail for logs. Never part of an HTTP response.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GenerationError::MalformedJson { detail }
            | GenerationError::ProviderTransient { detail }
            | GenerationError::Provider { detail } => Some(detail),
            _ => None,
        }
    }

    pub fn missing_job() -> Self {
        GenerationError::MissingInput(
            "Add or paste a job description before generating.".to_string(),
        )
    }

    pub fn missing_profile() -> Self {
        GenerationError::MissingInput(
            "Profile details are missing. Add your profile in the Profile tab before generating."
                .to_string(),
        )
    }

    pub fn incomplete_profile() -> Self {
        GenerationError::MissingInput(
            "Profile details are incomplete. Add experiences, education, projects, or skills before generating."
                .to_string(),
        )
    }

    pub fn empty_corpus() -> Self {
        GenerationError::NoContext(
            "Your context library is empty. Scan your resumes or documents before generating."
                .to_string(),
        )
    }

    pub fn no_relevant_chunks() -> Self {
        GenerationError::NoContext(
            "None of your documents match this job description. Add more source material and try again."
                .to_string(),
        )
    }

    pub fn transient(detail: impl Into<String>) -> Self {
        GenerationError::ProviderTransient {
            detail: detail.into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Application errors
// ────────────────────────────────────────────────────────────────────────────

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn generation_status(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::MissingInput => (StatusCode::BAD_REQUEST, "MISSING_INPUT"),
        ErrorKind::NoContext => (StatusCode::UNPROCESSABLE_ENTITY, "NO_CONTEXT"),
        ErrorKind::BudgetExceeded => (StatusCode::PAYLOAD_TOO_LARGE, "BUDGET_EXCEEDED"),
        ErrorKind::EmptyResponse => (StatusCode::SERVICE_UNAVAILABLE, "EMPTY_RESPONSE"),
        ErrorKind::MalformedJson => (StatusCode::BAD_GATEWAY, "MALFORMED_JSON"),
        ErrorKind::ProviderTransient => (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE"),
        ErrorKind::Provider => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Generation(e) => {
                if let Some(detail) = e.detail() {
                    tracing::error!("Generation failed ({:?}): {detail}", e.kind());
                }
                let (status, code) = generation_status(e.kind());
                (status, code, e.to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
