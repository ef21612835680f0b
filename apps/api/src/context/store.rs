use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tracing::warn;

use crate::models::job::JobDescription;
use crate::models::profile::CandidateProfile;

const JOB_DESCRIPTION_KEY: &str = "riseai:jobDescription";
const PROFILE_KEY: &str = "riseai:context";

/// Key-value state for the current job description and candidate profile.
///
/// Generation only reads through this trait; handlers own the writes.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn get_job_description(&self) -> Result<Option<JobDescription>>;
    async fn set_job_description(&self, job: &JobDescription) -> Result<()>;
    async fn get_candidate_profile(&self) -> Result<Option<CandidateProfile>>;
    async fn set_candidate_profile(&self, profile: &CandidateProfile) -> Result<()>;
}

pub struct PgContextStore {
    pool: PgPool,
}

impl PgContextStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM app_state WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("failed to read '{key}'"))?;

        let Some(value) = value else {
            return Ok(None);
        };

        // a stale shape should not block the rest of the app
        match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!("Ignoring unreadable stored value for '{key}': {e}");
                Ok(None)
            }
        }
    }

    async fn set_value<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)?;
        sqlx::query(
            "INSERT INTO app_state (key, value, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(json)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write '{key}'"))?;
        Ok(())
    }
}

#[async_trait]
impl ContextStore for PgContextStore {
    async fn get_job_description(&self) -> Result<Option<JobDescription>> {
        self.get_value(JOB_DESCRIPTION_KEY).await
    }

    async fn set_job_description(&self, job: &JobDescription) -> Result<()> {
        self.set_value(JOB_DESCRIPTION_KEY, job).await
    }

    async fn get_candidate_profile(&self) -> Result<Option<CandidateProfile>> {
        self.get_value(PROFILE_KEY).await
    }

    async fn set_candidate_profile(&self, profile: &CandidateProfile) -> Result<()> {
        self.set_value(PROFILE_KEY, profile).await
    }
}
