use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The job description currently targeted by generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub text: String,
    /// `auto`, `selection`, `manual` or `request`.
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

impl JobDescription {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
