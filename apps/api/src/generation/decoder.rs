//! Response decoding: raw model text into a resume or a cover letter.
//!
//! Models wrap JSON in prose or markdown fences often enough that a strict
//! parse alone is not usable. Candidates are tried in a fixed order and the
//! first one that parses wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::GenerationError;
use crate::models::resume::StructuredResume;

static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*title::(.*)$").expect("static regex is valid"));
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(.*?)```").expect("static regex is valid"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("static regex is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResume {
    pub resume: StructuredResume,
    pub generated_title: Option<String>,
}

/// Splits an optional leading `title::` line off the response.
fn split_title(text: &str) -> (Option<String>, &str) {
    let (first, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (text, ""),
    };
    match TITLE_LINE.captures(first.trim_end_matches('\r')) {
        Some(caps) => {
            let title = caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| !t.is_empty());
            (title, rest.trim())
        }
        None => (None, text),
    }
}

/// Alternative JSON payloads inside `text`, in the order they are tried.
fn json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    if let Some(m) = JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        candidates.push(m.as_str());
    }
    if let Some(m) = ANY_FENCE.captures(text).and_then(|c| c.get(1)) {
        candidates.push(m.as_str());
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            candidates.push(&text[start..=end]);
        }
    }
    candidates
}

/// Parses the JSON payload of a response: the whole text first, then each
/// candidate in turn. Fails with the error of the direct parse.
fn parse_json_payload(text: &str) -> Result<Value, GenerationError> {
    let direct_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for candidate in json_candidates(text) {
        match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(value) => return Ok(value),
            Err(e) => debug!("JSON candidate rejected: {e}"),
        }
    }

    Err(GenerationError::MalformedJson {
        detail: direct_error.to_string(),
    })
}

pub fn decode_resume(raw: &str) -> Result<DecodedResume, GenerationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let (generated_title, body) = split_title(text);
    if body.is_empty() {
        return Err(GenerationError::MalformedJson {
            detail: "response contained only a title line".to_string(),
        });
    }

    let value = parse_json_payload(body)?;
    let resume = StructuredResume::from_value(value).map_err(|e| GenerationError::MalformedJson {
        detail: e.to_string(),
    })?;

    Ok(DecodedResume {
        resume,
        generated_title,
    })
}

pub fn decode_cover_letter(raw: &str) -> Result<String, GenerationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}
