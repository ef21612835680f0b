pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::context::handlers as context;
use crate::corpus::handlers as corpus;
use crate::generation::handlers as generation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job description and profile
        .route(
            "/api/v1/job",
            get(context::handle_get_job).put(context::handle_put_job),
        )
        .route(
            "/api/v1/profile",
            get(context::handle_get_profile).put(context::handle_put_profile),
        )
        // Corpus
        .route("/api/v1/corpus/scan", post(corpus::handle_scan))
        .route("/api/v1/corpus/documents", get(corpus::handle_list_documents))
        .route("/api/v1/corpus/search", get(corpus::handle_search))
        // Generation
        .route(
            "/api/v1/model/availability",
            get(generation::handle_model_availability),
        )
        .route(
            "/api/v1/generate/resume",
            post(generation::handle_generate_resume),
        )
        .route(
            "/api/v1/generate/cover-letter",
            post(generation::handle_generate_cover_letter),
        )
        .route("/api/v1/documents", get(generation::handle_list_documents))
        .route("/api/v1/documents/:id", get(generation::handle_get_document))
        .with_state(state)
}
