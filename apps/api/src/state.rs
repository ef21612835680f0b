use std::sync::Arc;

use crate::config::Config;
use crate::context::store::ContextStore;
use crate::corpus::index::ChunkIndex;
use crate::corpus::store::CorpusStore;
use crate::generation::history::HistoryStore;
use crate::llm_client::ModelRuntime;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<dyn CorpusStore>,
    /// Lexical index over `corpus`. Invalidate after every corpus rewrite.
    pub index: Arc<ChunkIndex>,
    pub context: Arc<dyn ContextStore>,
    pub history: Arc<dyn HistoryStore>,
    pub model: Arc<dyn ModelRuntime>,
    pub config: Config,
}
