//! Token budget estimation for the on-device model.
//!
//! Character-based approximation (~4 characters per token). Deliberately not a
//! real tokenizer: it is conservative for English prose and needs no model files.

use serde::{Deserialize, Serialize};

pub const CHARS_PER_TOKEN: usize = 4;

/// Default assumed size of one retrieved chunk, in characters.
pub const DEFAULT_AVG_CHUNK_CHARS: usize = 800;

/// Default token reserve for the instruction block around the context.
pub const DEFAULT_INSTRUCTION_OVERHEAD: usize = 200;

/// Stated limits of the on-device model.
pub struct ModelLimits;

impl ModelLimits {
    pub const PER_PROMPT: usize = 1024;
    pub const SESSION_CONTEXT: usize = 4096;
    pub const MAX_CONTEXT: usize = 6144;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBreakdown {
    pub system: usize,
    pub user: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTokens {
    pub system_tokens: usize,
    pub user_tokens: usize,
    pub total: usize,
    pub breakdown: TokenBreakdown,
}

impl PromptTokens {
    pub fn exceeds(&self, limit: usize) -> bool {
        self.total > limit
    }
}

/// Estimated token count: `ceil(chars / 4)`, zero for empty text.
pub fn estimate_tokens(text: &str) -> usize {
    estimate_tokens_for_chars(text.chars().count())
}

fn estimate_tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Cuts `text` to roughly `max_tokens`, appending `...` when anything was dropped.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens * CHARS_PER_TOKEN;
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Sums independent estimates for the system and user prompts.
pub fn calculate_prompt_tokens(system_prompt: &str, user_prompt: &str) -> PromptTokens {
    let system_tokens = estimate_tokens(system_prompt);
    let user_tokens = estimate_tokens(user_prompt);
    PromptTokens {
        system_tokens,
        user_tokens,
        total: system_tokens + user_tokens,
        breakdown: TokenBreakdown {
            system: system_tokens,
            user: user_tokens,
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaxChunksParams<'a> {
    pub system_prompt: &'a str,
    pub job_description: &'a str,
    /// Average chunk size in characters.
    pub avg_chunk_size: usize,
    /// Instruction overhead in tokens.
    pub overhead: usize,
}

impl<'a> MaxChunksParams<'a> {
    pub fn new(system_prompt: &'a str, job_description: &'a str) -> Self {
        Self {
            system_prompt,
            job_description,
            avg_chunk_size: DEFAULT_AVG_CHUNK_CHARS,
            overhead: DEFAULT_INSTRUCTION_OVERHEAD,
        }
    }
}

/// How many chunks of `avg_chunk_size` characters still fit the per-prompt budget
/// after the system prompt, job description, and instruction overhead.
///
/// Never negative: returns 0 once the fixed parts alone exhaust the budget.
pub fn calculate_max_chunks(params: MaxChunksParams<'_>) -> usize {
    let system_tokens = estimate_tokens(params.system_prompt);
    let job_tokens = estimate_tokens(params.job_description);
    let overhead_tokens = estimate_tokens_for_chars(params.overhead * CHARS_PER_TOKEN);

    let used = system_tokens + job_tokens + overhead_tokens;
    let Some(remaining) = ModelLimits::PER_PROMPT.checked_sub(used).filter(|r| *r > 0) else {
        return 0;
    };

    let tokens_per_chunk = estimate_tokens_for_chars(params.avg_chunk_size).max(1);
    remaining / tokens_per_chunk
}
