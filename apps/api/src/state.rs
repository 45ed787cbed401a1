use std::sync::Arc;

use crate::config::Config;
use crate::jsearch::JSearchClient;
use crate::pipeline::Coordinator;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after start-up.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Stage pipeline; owns the completion units and, through them, the model client.
    pub coordinator: Arc<Coordinator>,
    /// Direct access for the salary and job search endpoints.
    pub jsearch: JSearchClient,
}
