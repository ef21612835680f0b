//! Prompt composition: turns a job description plus candidate data into the
//! system/user prompt pair sent to the model.
//!
//! Two modes:
//! - profile-direct (canonical): the structured profile is rendered into a
//!   bounded snapshot. Over-budget prompts are only logged.
//! - corpus: the chunk index supplies the most relevant excerpts, sized by the
//!   budget estimator, and the lowest-ranked excerpts are dropped until the
//!   prompt fits. A prompt that cannot be made to fit is an error.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::corpus::index::ChunkIndex;
use crate::errors::GenerationError;
use crate::generation::budget::{
    calculate_max_chunks, calculate_prompt_tokens, MaxChunksParams, ModelLimits, PromptTokens,
};
use crate::generation::prompts;
use crate::generation::snapshot::{render_snapshot, SnapshotLimits};
use crate::models::chunk::ScoredChunk;
use crate::models::document::DocumentKind;
use crate::models::profile::CandidateProfile;

/// Each excerpt is cut to this many characters before it enters the prompt.
pub const MAX_CHUNK_CHARS: usize = 450;

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

/// Fixed text and limits for one document kind.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub kind: DocumentKind,
    pub system_prompt: &'static str,
    pub job_heading: &'static str,
    pub instructions: &'static str,
    pub snapshot: SnapshotLimits,
}

impl PromptTemplate {
    pub const RESUME: PromptTemplate = PromptTemplate {
        kind: DocumentKind::Resume,
        system_prompt: prompts::RESUME_SYSTEM,
        job_heading: prompts::RESUME_JOB_HEADING,
        instructions: prompts::RESUME_INSTRUCTIONS,
        snapshot: SnapshotLimits::RESUME,
    };

    pub const COVER_LETTER: PromptTemplate = PromptTemplate {
        kind: DocumentKind::CoverLetter,
        system_prompt: prompts::COVER_LETTER_SYSTEM,
        job_heading: prompts::COVER_LETTER_JOB_HEADING,
        instructions: prompts::COVER_LETTER_INSTRUCTIONS,
        snapshot: SnapshotLimits::COVER_LETTER,
    };
}

// ────────────────────────────────────────────────────────────────────────────
// Bundle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    #[default]
    Profile,
    Corpus,
}

/// Where the candidate data in a bundle came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PromptSource {
    Profile {
        profile: CandidateProfile,
    },
    Chunks {
        chunk_ids: Vec<String>,
        chunks_used: usize,
        chunks_requested: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub job: String,
    pub source: PromptSource,
    pub token_count: PromptTokens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBundle {
    pub system_prompt: String,
    pub user_prompt: String,
    pub metadata: PromptMetadata,
}

impl PromptBundle {
    /// The single prompt sent to the model: the system prompt is prepended to
    /// the user prompt rather than sent as a separate initial prompt.
    pub fn model_input(&self) -> String {
        format!("{}\n\n{}", self.system_prompt.trim(), self.user_prompt)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Composition
// ────────────────────────────────────────────────────────────────────────────

fn require_job(job_description: &str) -> Result<&str, GenerationError> {
    let job = job_description.trim();
    if job.is_empty() {
        return Err(GenerationError::missing_job());
    }
    Ok(job)
}

fn user_prompt(template: &PromptTemplate, job: &str, heading: &str, body: &str) -> String {
    format!(
        "{}\n{job}\n\n{heading}\n{body}\n\n{}",
        template.job_heading, template.instructions
    )
}

/// Profile-direct composition.
pub fn compose_from_profile(
    template: &PromptTemplate,
    job_description: &str,
    profile: Option<&CandidateProfile>,
) -> Result<PromptBundle, GenerationError> {
    let job = require_job(job_description)?;
    let profile = profile.ok_or_else(GenerationError::missing_profile)?;

    let snapshot = render_snapshot(profile, &template.snapshot);
    if snapshot.trim().is_empty() {
        return Err(GenerationError::incomplete_profile());
    }

    let user_prompt = user_prompt(template, job, prompts::PROFILE_HEADING, &snapshot);
    let token_count = calculate_prompt_tokens(template.system_prompt, &user_prompt);

    info!(
        "{} prompt composed from profile: system {} + user {} = {} tokens",
        template.kind.as_str(),
        token_count.system_tokens,
        token_count.user_tokens,
        token_count.total
    );
    if token_count.exceeds(ModelLimits::PER_PROMPT) {
        warn!(
            "{} prompt is {} tokens, over the {} token guideline; proceeding anyway",
            template.kind.as_str(),
            token_count.total,
            ModelLimits::PER_PROMPT
        );
    }

    Ok(PromptBundle {
        system_prompt: template.system_prompt.to_string(),
        user_prompt,
        metadata: PromptMetadata {
            job: job.to_string(),
            source: PromptSource::Profile {
                profile: profile.clone(),
            },
            token_count,
        },
    })
}

/// Number of excerpts to request: the caller's limit, capped by what the budget
/// estimator says fits, but never below one.
pub fn effective_chunk_limit(template: &PromptTemplate, job: &str, requested: usize) -> usize {
    let safe = calculate_max_chunks(MaxChunksParams::new(template.system_prompt, job));
    requested.max(1).min(safe.max(1))
}

/// Corpus (retrieval) composition.
pub async fn compose_from_corpus(
    template: &PromptTemplate,
    index: &ChunkIndex,
    job_description: &str,
    requested: usize,
) -> Result<PromptBundle, GenerationError> {
    let job = require_job(job_description)?;
    let effective = effective_chunk_limit(template, job, requested);

    let chunks = index.query(job, effective).await;
    if chunks.is_empty() {
        return Err(if index.corpus_size().await == 0 {
            GenerationError::empty_corpus()
        } else {
            GenerationError::no_relevant_chunks()
        });
    }

    fit_chunks_to_budget(template, job, chunks, requested)
}

fn clamp_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn context_block(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("[{}] {}", c.doc_id, clamp_chars(c.text.trim(), MAX_CHUNK_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Composes the retrieval user prompt for exactly these chunks.
pub fn compose_chunk_prompt(template: &PromptTemplate, job: &str, chunks: &[ScoredChunk]) -> String {
    user_prompt(template, job, prompts::CHUNKS_HEADING, &context_block(chunks))
}

/// Drops the lowest-ranked chunks until the prompt fits the per-prompt limit.
///
/// Each dropped chunk removes at least its `[doc_id] ` tag and one character of
/// text, so the estimate strictly decreases and the loop ends after at most
/// `chunks.len() - 1` steps.
pub fn fit_chunks_to_budget(
    template: &PromptTemplate,
    job: &str,
    mut chunks: Vec<ScoredChunk>,
    requested: usize,
) -> Result<PromptBundle, GenerationError> {
    let limit = ModelLimits::PER_PROMPT;
    let mut user_prompt = compose_chunk_prompt(template, job, &chunks);
    let mut token_count = calculate_prompt_tokens(template.system_prompt, &user_prompt);

    while token_count.exceeds(limit) && chunks.len() > 1 {
        chunks.pop();
        user_prompt = compose_chunk_prompt(template, job, &chunks);
        token_count = calculate_prompt_tokens(template.system_prompt, &user_prompt);
    }

    if chunks.is_empty() || token_count.exceeds(limit) {
        warn!(
            "{} prompt still {} tokens with {} chunk(s); limit {}",
            template.kind.as_str(),
            token_count.total,
            chunks.len(),
            limit
        );
        return Err(GenerationError::BudgetExceeded {
            total_tokens: token_count.total,
            limit,
        });
    }

    info!(
        "{} prompt composed from {} of {} requested chunks: {} tokens",
        template.kind.as_str(),
        chunks.len(),
        requested,
        token_count.total
    );

    Ok(PromptBundle {
        system_prompt: template.system_prompt.to_string(),
        user_prompt,
        metadata: PromptMetadata {
            job: job.to_string(),
            source: PromptSource::Chunks {
                chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
                chunks_used: chunks.len(),
                chunks_requested: requested,
            },
            token_count,
        },
    })
}
