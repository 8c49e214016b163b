use crate::state::AppState;
use axum::{extract::State, Json};
use casetrack_core::StorageBackend;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// `postgres` or `memory`
    pub store: String,
    /// Storage backends in fallback order
    pub storage_targets: Vec<StorageBackend>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        store: state.store.kind().to_string(),
        storage_targets: state.storage.backends(),
    })
}
