use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedPath};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use casetrack_core::models::{CaseInput, CrimeCase, DeleteResponse};
use std::sync::Arc;
use uuid::Uuid;

/// Set on list responses served from a failed store read.
pub const DEGRADED_HEADER: &str = "x-casetrack-degraded";

#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "cases",
    responses(
        (status = 200, description = "Cases, newest first", body = Vec<CrimeCase>)
    )
)]
pub async fn list_cases(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let listing = state.cases.list_cases().await;
    let mut response = Json(listing.cases).into_response();
    if listing.degraded {
        response.headers_mut().insert(
            HeaderName::from_static(DEGRADED_HEADER),
            HeaderValue::from_static("true"),
        );
    }
    response
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "The case", body = CrimeCase),
        (status = 400, description = "Malformed ID", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(case_id = %id, operation = "get_case"))]
pub async fn get_case(
    State(state): State<Arc<AppState>>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<CrimeCase>, HttpAppError> {
    Ok(Json(state.cases.get_case(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/cases",
    tag = "cases",
    request_body = CaseInput,
    responses(
        (status = 201, description = "Case created", body = CrimeCase),
        (status = 400, description = "Missing or malformed fields", body = ErrorResponse)
    )
)]
pub async fn create_case(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<CaseInput>,
) -> Result<(StatusCode, Json<CrimeCase>), HttpAppError> {
    let case = state.cases.create_case(input).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

#[utoipa::path(
    put,
    path = "/api/cases/{id}",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = CaseInput,
    responses(
        (status = 200, description = "Case updated", body = CrimeCase),
        (status = 400, description = "Malformed fields", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    )
)]
pub async fn update_case(
    State(state): State<Arc<AppState>>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(input): ValidatedJson<CaseInput>,
) -> Result<Json<CrimeCase>, HttpAppError> {
    Ok(Json(state.cases.update_case(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    tag = "cases",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case and its evidence deleted", body = DeleteResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    )
)]
pub async fn delete_case(
    State(state): State<Arc<AppState>>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<DeleteResponse>, HttpAppError> {
    let success = state.cases.delete_case(id).await?;
    Ok(Json(DeleteResponse { success }))
}
