use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::jsearch::{JobRecord, JobSearchParams, SalaryEstimate};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SalaryRequest {
    pub job_title: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Serialize)]
pub struct JobSearchResponse {
    pub query: String,
    pub jobs: Vec<JobRecord>,
}

/// POST /api/v1/salary/estimate
/// Upstream failures come back as an estimate with `error` set, not as an HTTP error.
pub async fn handle_salary_estimate(
    State(state): State<AppState>,
    Json(req): Json<SalaryRequest>,
) -> Result<Json<SalaryEstimate>, AppError> {
    let job_title = req.job_title.trim();
    if job_title.is_empty() {
        return Err(AppError::Validation("job_title must not be empty".to_string()));
    }
    let estimate = state
        .jsearch
        .estimate_salary(job_title, req.location.as_deref())
        .await;
    Ok(Json(estimate))
}

/// POST /api/v1/jobs/search
pub async fn handle_job_search(
    State(state): State<AppState>,
    Json(mut params): Json<JobSearchParams>,
) -> Result<Json<JobSearchResponse>, AppError> {
    params.query = params.query.trim().to_string();
    if params.query.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }
    let jobs = state.jsearch.search_jobs(&params).await;
    Ok(Json(JobSearchResponse {
        query: params.query,
        jobs,
    }))
}
