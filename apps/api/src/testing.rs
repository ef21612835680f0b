//! In-memory stores and a scripted model for unit and router tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::config::Config;
use crate::context::store::ContextStore;
use crate::corpus::index::ChunkIndex;
use crate::corpus::store::CorpusStore;
use crate::errors::GenerationError;
use crate::generation::history::HistoryStore;
use crate::llm_client::{
    Availability, AvailabilityState, ModelReply, ModelRuntime, SessionHandle, SessionOptions,
};
use crate::models::chunk::{Chunk, SourceDocument};
use crate::models::document::GeneratedDocument;
use crate::models::job::JobDescription;
use crate::models::profile::CandidateProfile;
use crate::state::AppState;

pub fn chunk(id: &str, doc_id: &str, order: i32, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        doc_id: doc_id.to_string(),
        text: text.to_string(),
        order,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stores
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCorpus {
    documents: Mutex<Vec<SourceDocument>>,
    chunks: Mutex<Vec<Chunk>>,
    list_calls: AtomicUsize,
    failing: bool,
}

impl MemoryCorpus {
    pub fn with_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: Mutex::new(chunks),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn set_chunks(&self, chunks: Vec<Chunk>) {
        *self.chunks.lock().unwrap() = chunks;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpus {
    async fn list_all_chunks(&self) -> Result<Vec<Chunk>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(anyhow!("corpus store offline"));
        }
        Ok(self.chunks.lock().unwrap().clone())
    }

    async fn list_documents(&self) -> Result<Vec<SourceDocument>> {
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn replace_corpus(&self, documents: &[SourceDocument], chunks: &[Chunk]) -> Result<()> {
        *self.documents.lock().unwrap() = documents.to_vec();
        *self.chunks.lock().unwrap() = chunks.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryContext {
    job: Mutex<Option<JobDescription>>,
    profile: Mutex<Option<CandidateProfile>>,
}

#[async_trait]
impl ContextStore for MemoryContext {
    async fn get_job_description(&self) -> Result<Option<JobDescription>> {
        Ok(self.job.lock().unwrap().clone())
    }

    async fn set_job_description(&self, job: &JobDescription) -> Result<()> {
        *self.job.lock().unwrap() = Some(job.clone());
        Ok(())
    }

    async fn get_candidate_profile(&self) -> Result<Option<CandidateProfile>> {
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn set_candidate_profile(&self, profile: &CandidateProfile) -> Result<()> {
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    documents: Mutex<Vec<GeneratedDocument>>,
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn save(&self, document: &GeneratedDocument) -> Result<()> {
        self.documents.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<GeneratedDocument>> {
        let mut documents = self.documents.lock().unwrap().clone();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        documents.truncate(limit);
        Ok(documents)
    }

    async fn get(&self, id: Uuid) -> Result<Option<GeneratedDocument>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model
// ────────────────────────────────────────────────────────────────────────────

/// Answers each `prompt` call with the next scripted result.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelReply, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    options: Mutex<Vec<SessionOptions>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelReply, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn reply(text: &str) -> ModelReply {
        ModelReply {
            text: text.to_string(),
            finish_reason: "stop".to_string(),
            usage: None,
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<SessionOptions> {
        self.options.lock().unwrap().last().copied()
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn sessions_destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelRuntime for ScriptedModel {
    async fn availability(&self) -> Result<Availability, GenerationError> {
        Ok(Availability {
            state: AvailabilityState::Available,
        })
    }

    async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<SessionHandle, GenerationError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        self.options.lock().unwrap().push(options);
        Ok(SessionHandle {
            id: format!("session-{n}"),
        })
    }

    async fn prompt(
        &self,
        _session: &SessionHandle,
        text: &str,
    ) -> Result<ModelReply, GenerationError> {
        self.prompts.lock().unwrap().push(text.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::transient("script exhausted")))
    }

    async fn destroy(&self, _session: SessionHandle) -> Result<(), GenerationError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// App state
// ────────────────────────────────────────────────────────────────────────────

pub struct TestApp {
    pub state: AppState,
    pub corpus: Arc<MemoryCorpus>,
    pub context: Arc<MemoryContext>,
    pub history: Arc<MemoryHistory>,
    pub model: Arc<ScriptedModel>,
}

pub fn test_app(chunks: Vec<Chunk>, script: Vec<Result<ModelReply, GenerationError>>) -> TestApp {
    let corpus = Arc::new(MemoryCorpus::with_chunks(chunks));
    let context = Arc::new(MemoryContext::default());
    let history = Arc::new(MemoryHistory::default());
    let model = Arc::new(ScriptedModel::new(script));

    let state = AppState {
        corpus: corpus.clone(),
        index: Arc::new(ChunkIndex::new(corpus.clone())),
        context: context.clone(),
        history: history.clone(),
        model: model.clone(),
        config: Config {
            database_url: "postgres://unused".to_string(),
            model_endpoint: "http://unused".to_string(),
            model_timeout_secs: 5,
            default_chunk_limit: 12,
            port: 0,
            rust_log: "debug".to_string(),
        },
    };

    TestApp {
        state,
        corpus,
        context,
        history,
        model,
    }
}
