use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::job::JobDescription;
use crate::models::profile::CandidateProfile;
use crate::state::AppState;

const JOB_SOURCES: [&str; 4] = ["auto", "selection", "manual", "request"];

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub text: String,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: Option<JobDescription>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Option<CandidateProfile>,
}

/// GET /api/v1/job
pub async fn handle_get_job(State(state): State<AppState>) -> Result<Json<JobResponse>, AppError> {
    let job = state.context.get_job_description().await?;
    Ok(Json(JobResponse { job }))
}

/// PUT /api/v1/job
///
/// Replaces the current job description. Blank text clears the target role.
pub async fn handle_put_job(
    State(state): State<AppState>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let source = req.source.unwrap_or_else(|| "manual".to_string());
    if !JOB_SOURCES.contains(&source.as_str()) {
        return Err(AppError::Validation(format!(
            "source must be one of {}",
            JOB_SOURCES.join(", ")
        )));
    }

    let job = JobDescription::new(req.text.trim(), source);
    state.context.set_job_description(&job).await?;
    info!(
        "Job description updated ({} chars, source {})",
        job.text.chars().count(),
        job.source
    );

    Ok(Json(JobResponse { job: Some(job) }))
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.context.get_candidate_profile().await?;
    Ok(Json(ProfileResponse { profile }))
}

/// PUT /api/v1/profile
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Json(profile): Json<CandidateProfile>,
) -> Result<Json<ProfileResponse>, AppError> {
    state.context.set_candidate_profile(&profile).await?;
    info!(
        "Candidate profile updated: {} experience, {} projects, {} skills",
        profile.experience.len(),
        profile.projects.len(),
        profile.skills.len()
    );
    Ok(Json(ProfileResponse {
        profile: Some(profile),
    }))
}
