pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jsearch::handlers as jsearch;
use crate::pipeline::handlers as pipeline;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        // Résumé analysis
        .route("/api/v1/analyze", post(pipeline::handle_analyze))
        .route("/api/v1/resume/extract", post(pipeline::handle_extract))
        // Direct job-market lookups
        .route("/api/v1/salary/estimate", post(jsearch::handle_salary_estimate))
        .route("/api/v1/jobs/search", post(jsearch::handle_job_search))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
