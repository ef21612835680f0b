mod config;
mod context;
mod corpus;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod routes;
mod state;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::context::store::PgContextStore;
use crate::corpus::index::ChunkIndex;
use crate::corpus::store::PgCorpusStore;
use crate::db::{create_pool, ensure_schema};
use crate::generation::budget::ModelLimits;
use crate::generation::generator::{COVER_LETTER_SESSION, RESUME_SESSION};
use crate::generation::history::PgHistoryStore;
use crate::llm_client::HttpModelClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rise AI API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Stores and the chunk index over the scanned corpus
    let corpus = Arc::new(PgCorpusStore::new(db.clone()));
    let index = Arc::new(ChunkIndex::new(corpus.clone()));
    let context = Arc::new(PgContextStore::new(db.clone()));
    let history = Arc::new(PgHistoryStore::new(db));

    // Initialize model client
    let model = HttpModelClient::new(
        &config.model_endpoint,
        Duration::from_secs(config.model_timeout_secs),
    )?;
    info!(
        "Model client initialized ({}, timeout {}s)",
        config.model_endpoint, config.model_timeout_secs
    );
    info!(
        "Session defaults: resume {:?}, cover letter {:?}",
        RESUME_SESSION, COVER_LETTER_SESSION
    );
    info!(
        "Token limits: {} per prompt, {} session context, {} max context",
        ModelLimits::PER_PROMPT,
        ModelLimits::SESSION_CONTEXT,
        ModelLimits::MAX_CONTEXT
    );

    // Build app state
    let state = AppState {
        corpus,
        index,
        context,
        history,
        model: Arc::new(model),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
