use axum::Json;
use casetrack_core::constants::CRIME_TYPES;

/// Advisory crime types offered to clients.
#[utoipa::path(
    get,
    path = "/api/catalog/crime-types",
    tag = "catalog",
    responses((status = 200, description = "Crime type names", body = Vec<String>))
)]
pub async fn crime_types() -> Json<Vec<String>> {
    Json(CRIME_TYPES.iter().map(|t| t.to_string()).collect())
}
