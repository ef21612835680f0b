//! Generation orchestrator: compose, prompt, decode, retry.
//!
//! Flow per attempt: compose prompt (profile snapshot or ranked chunks) →
//! fresh model session → one prompt → destroy session → decode.
//!
//! Attempts follow a fixed plan of chunk limits. Only failures whose kind is
//! retryable (empty response, transient provider error) move on to the next
//! entry; everything else is returned straight away.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::corpus::index::ChunkIndex;
use crate::errors::GenerationError;
use crate::generation::budget::truncate_to_tokens;
use crate::generation::composer::{
    compose_from_corpus, compose_from_profile, CompositionMode, PromptBundle, PromptTemplate,
};
use crate::generation::decoder::{decode_cover_letter, decode_resume};
use crate::llm_client::{ModelReply, ModelRuntime, SessionOptions};
use crate::models::document::DocumentKind;
use crate::models::profile::CandidateProfile;
use crate::models::resume::StructuredResume;

/// Smallest chunk limit the fallback attempt will use.
const MIN_FALLBACK_CHUNKS: usize = 3;

/// Raw text preview length in log lines, in tokens.
const LOG_PREVIEW_TOKENS: usize = 60;

pub const RESUME_SESSION: SessionOptions = SessionOptions {
    temperature: 0.25,
    top_k: 32,
};

pub const COVER_LETTER_SESSION: SessionOptions = SessionOptions {
    temperature: 0.35,
    top_k: 32,
};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Fully resolved inputs for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub job_description: &'a str,
    pub mode: CompositionMode,
    pub profile: Option<&'a CandidateProfile>,
    pub chunk_limit: usize,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
}

impl GenerationRequest<'_> {
    fn session_options(&self, kind: DocumentKind) -> SessionOptions {
        let defaults = match kind {
            DocumentKind::Resume => RESUME_SESSION,
            DocumentKind::CoverLetter => COVER_LETTER_SESSION,
        };
        SessionOptions {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_k: self.top_k.unwrap_or(defaults.top_k),
        }
    }
}

/// Provenance of a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub prompt: PromptBundle,
    pub chunk_limit: usize,
    pub attempts: usize,
    pub finish_reason: String,
    pub usage: Option<Value>,
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeGeneration {
    pub resume: StructuredResume,
    pub generated_title: Option<String>,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverLetterGeneration {
    pub letter: String,
    pub metadata: GenerationMetadata,
}

/// What happened during one attempt. Lives only for the duration of a call.
#[derive(Debug, Default)]
struct GenerationAttempt {
    chunk_limit: usize,
    bundle: Option<PromptBundle>,
    raw_text: Option<String>,
    error: Option<GenerationError>,
}

impl GenerationAttempt {
    fn retryable(&self) -> bool {
        self.error.as_ref().is_some_and(GenerationError::is_retryable)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Attempt plan
// ────────────────────────────────────────────────────────────────────────────

/// Chunk limits to try, in order: the requested limit, then half of it (but at
/// least 3) when that differs.
pub fn attempt_plan(requested: usize) -> Vec<usize> {
    let requested = requested.max(1);
    let fallback = (requested / 2).max(MIN_FALLBACK_CHUNKS);
    let mut plan = vec![requested];
    if fallback != requested {
        plan.push(fallback);
    }
    plan
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_resume(
    index: &ChunkIndex,
    model: &dyn ModelRuntime,
    request: &GenerationRequest<'_>,
) -> Result<ResumeGeneration, GenerationError> {
    let (decoded, metadata) =
        run_with_retries(&PromptTemplate::RESUME, index, model, request, decode_resume).await?;

    info!(
        "Resume generated: {} sections, title {:?}",
        decoded.resume.sections.len(),
        decoded.generated_title
    );

    Ok(ResumeGeneration {
        resume: decoded.resume,
        generated_title: decoded.generated_title,
        metadata,
    })
}

pub async fn generate_cover_letter(
    index: &ChunkIndex,
    model: &dyn ModelRuntime,
    request: &GenerationRequest<'_>,
) -> Result<CoverLetterGeneration, GenerationError> {
    let (letter, metadata) = run_with_retries(
        &PromptTemplate::COVER_LETTER,
        index,
        model,
        request,
        decode_cover_letter,
    )
    .await?;

    info!("Cover letter generated: {} chars", letter.chars().count());

    Ok(CoverLetterGeneration { letter, metadata })
}

async fn run_with_retries<T>(
    template: &PromptTemplate,
    index: &ChunkIndex,
    model: &dyn ModelRuntime,
    request: &GenerationRequest<'_>,
    decode: fn(&str) -> Result<T, GenerationError>,
) -> Result<(T, GenerationMetadata), GenerationError> {
    let plan = attempt_plan(request.chunk_limit);
    let options = request.session_options(template.kind);
    let mut attempts: Vec<GenerationAttempt> = Vec::with_capacity(plan.len());

    for chunk_limit in plan {
        let mut attempt = GenerationAttempt {
            chunk_limit,
            ..Default::default()
        };

        let outcome = run_attempt(template, index, model, request, options, &mut attempt)
            .await
            .and_then(|reply| decode(&reply.text).map(|artifact| (artifact, reply)));

        match outcome {
            Ok((artifact, reply)) => {
                let metadata = GenerationMetadata {
                    prompt: attempt.bundle.take().ok_or_else(|| {
                        GenerationError::transient("attempt finished without a prompt")
                    })?,
                    chunk_limit,
                    attempts: attempts.len() + 1,
                    finish_reason: reply.finish_reason,
                    usage: reply.usage,
                    raw_text: reply.text,
                };
                return Ok((artifact, metadata));
            }
            Err(e) => {
                if let Some(raw) = attempt.raw_text.as_deref() {
                    warn!(
                        "Raw {} response: {}",
                        template.kind.as_str(),
                        truncate_to_tokens(raw, LOG_PREVIEW_TOKENS)
                    );
                }
                warn!(
                    "{} attempt {} (chunk limit {}) failed with {:?}: {}",
                    template.kind.as_str(),
                    attempts.len() + 1,
                    chunk_limit,
                    e.kind(),
                    e.detail().unwrap_or(&e.to_string())
                );
                attempt.error = Some(e);
                let retryable = attempt.retryable();
                attempts.push(attempt);
                if !retryable {
                    break;
                }
            }
        }
    }

    let tried: Vec<usize> = attempts.iter().map(|a| a.chunk_limit).collect();
    warn!(
        "{} generation gave up after chunk limits {:?}",
        template.kind.as_str(),
        tried
    );

    Err(attempts
        .pop()
        .and_then(|a| a.error)
        .unwrap_or_else(|| GenerationError::transient("generation failed")))
}

/// One compose → prompt cycle. The session is destroyed on every path once created.
async fn run_attempt(
    template: &PromptTemplate,
    index: &ChunkIndex,
    model: &dyn ModelRuntime,
    request: &GenerationRequest<'_>,
    options: SessionOptions,
    attempt: &mut GenerationAttempt,
) -> Result<ModelReply, GenerationError> {
    let bundle = match request.mode {
        CompositionMode::Profile => {
            compose_from_profile(template, request.job_description, request.profile)?
        }
        CompositionMode::Corpus => {
            compose_from_corpus(template, index, request.job_description, attempt.chunk_limit)
                .await?
        }
    };
    let input = bundle.model_input();
    attempt.bundle = Some(bundle);

    let session = model.create_session(options).await?;
    let reply = model.prompt(&session, &input).await;
    if let Err(e) = model.destroy(session).await {
        warn!("Failed to destroy model session: {e}");
    }

    let reply = reply?;
    attempt.raw_text = Some(reply.text.clone());
    if reply.text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::generation::composer::PromptSource;
    use crate::models::profile::ExperienceItem;
    use crate::testing::{chunk, MemoryCorpus, ScriptedModel};
    use std::sync::Arc;

    const RESUME_JSON: &str = r#"{"version":"1","header":{"fullName":"Jane Doe"},"sections":[{"id":"skills","title":"Skills","content":["Rust"]}]}"#;

    fn corpus_index() -> ChunkIndex {
        ChunkIndex::new(Arc::new(MemoryCorpus::with_chunks(vec![
            chunk("c1", "a", 0, "Built React dashboards for the billing team."),
            chunk("c2", "b", 0, "Maintained Node.js services."),
            chunk("c3", "c", 0, "Showed leadership mentoring four engineers."),
        ])))
    }

    fn profile() -> CandidateProfile {
        CandidateProfile {
            experience: vec![ExperienceItem {
                title: Some("Engineer".to_string()),
                company: Some("Acme".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn corpus_request(chunk_limit: usize) -> GenerationRequest<'static> {
        GenerationRequest {
            job_description: "Looking for a React engineer with leadership experience",
            mode: CompositionMode::Corpus,
            profile: None,
            chunk_limit,
            temperature: None,
            top_k: None,
        }
    }

    #[test]
    fn test_attempt_plan() {
        assert_eq!(attempt_plan(12), vec![12, 6]);
        assert_eq!(attempt_plan(4), vec![4, 3]);
        assert_eq!(attempt_plan(3), vec![3]);
        assert_eq!(attempt_plan(2), vec![2, 3]);
        assert_eq!(attempt_plan(0), vec![1, 3]);
        assert!(attempt_plan(100).len() <= 2);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let model = ScriptedModel::new(vec![Ok(ScriptedModel::reply(&format!(
            "title::Acme Resume - Jane Doe\n{RESUME_JSON}"
        )))]);
        let result = generate_resume(&corpus_index(), &model, &corpus_request(12))
            .await
            .unwrap();

        assert_eq!(result.generated_title.as_deref(), Some("Acme Resume - Jane Doe"));
        assert_eq!(result.resume.header.full_name, "Jane Doe");
        assert_eq!(result.metadata.attempts, 1);
        assert_eq!(result.metadata.chunk_limit, 12);
        assert_eq!(result.metadata.finish_reason, "stop");
        assert!(matches!(
            result.metadata.prompt.metadata.source,
            PromptSource::Chunks { .. }
        ));
        assert_eq!(model.sessions_created(), 1);
        assert_eq!(model.sessions_destroyed(), 1);
        assert_eq!(model.last_options(), Some(RESUME_SESSION));

        let sent = model.prompts();
        assert!(sent[0].starts_with(PromptTemplate::RESUME.system_prompt.trim()));
    }

    #[tokio::test]
    async fn test_empty_response_retries_with_smaller_limit() {
        let model = ScriptedModel::new(vec![
            Ok(ScriptedModel::reply("   ")),
            Ok(ScriptedModel::reply(RESUME_JSON)),
        ]);
        let result = generate_resume(&corpus_index(), &model, &corpus_request(12))
            .await
            .unwrap();

        assert_eq!(result.metadata.attempts, 2);
        assert_eq!(result.metadata.chunk_limit, 6);
        assert_eq!(model.sessions_created(), 2);
        assert_eq!(model.sessions_destroyed(), 2);
    }

    #[tokio::test]
    async fn test_every_attempt_failing_returns_last_error() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::transient("first")),
            Err(GenerationError::transient("second")),
            Ok(ScriptedModel::reply(RESUME_JSON)),
        ]);
        let err = generate_resume(&corpus_index(), &model, &corpus_request(12))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderTransient);
        assert_eq!(err.detail(), Some("second"));
        assert_eq!(model.prompts().len(), 2);
        assert_eq!(model.sessions_destroyed(), 2);
    }

    #[tokio::test]
    async fn test_malformed_json_is_not_retried() {
        let model = ScriptedModel::new(vec![
            Ok(ScriptedModel::reply("no json here")),
            Ok(ScriptedModel::reply(RESUME_JSON)),
        ]);
        let err = generate_resume(&corpus_index(), &model, &corpus_request(12))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedJson);
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_composition_error_never_reaches_model() {
        let model = ScriptedModel::new(vec![]);
        let request = GenerationRequest {
            job_description: "React engineer",
            mode: CompositionMode::Profile,
            profile: None,
            chunk_limit: 12,
            temperature: None,
            top_k: None,
        };
        let err = generate_resume(&corpus_index(), &model, &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);
        assert_eq!(model.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_session_destroyed_when_prompt_fails() {
        let model = ScriptedModel::new(vec![Err(GenerationError::Provider {
            detail: "bad request".to_string(),
        })]);
        let err = generate_resume(&corpus_index(), &model, &corpus_request(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(model.sessions_created(), 1);
        assert_eq!(model.sessions_destroyed(), 1);
    }

    #[tokio::test]
    async fn test_cover_letter_from_profile_with_overrides() {
        let model = ScriptedModel::new(vec![Ok(ScriptedModel::reply(
            "\nDear Hiring Manager,\n\nRE: Engineer at Acme\n",
        ))]);
        let profile = profile();
        let request = GenerationRequest {
            job_description: "Engineer at Acme",
            mode: CompositionMode::Profile,
            profile: Some(&profile),
            chunk_limit: 12,
            temperature: Some(0.7),
            top_k: None,
        };
        let result = generate_cover_letter(&corpus_index(), &model, &request)
            .await
            .unwrap();

        assert_eq!(result.letter, "Dear Hiring Manager,\n\nRE: Engineer at Acme");
        assert_eq!(
            model.last_options(),
            Some(SessionOptions {
                temperature: 0.7,
                top_k: COVER_LETTER_SESSION.top_k
            })
        );
        assert!(model.prompts()[0].contains("Experience 1: Engineer at Acme"));
    }
}
