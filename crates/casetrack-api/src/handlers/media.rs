use crate::error::{ErrorResponse, HttpAppError, ValidatedPath};
use crate::services::{ReceivedFile, UploadBatch};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use casetrack_core::models::{AttachMediaResponse, DeleteMediaResponse};
use casetrack_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{}: {}", context, e.body_text()))
    } else {
        AppError::InvalidInput(format!("{}: {}", context, e.body_text()))
    }
}

/// Reads every file part in arrival order. Parts without a filename are
/// plain form fields and are skipped.
async fn read_batch(multipart: &mut Multipart) -> Result<UploadBatch, AppError> {
    let mut batch = UploadBatch::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        let Some(original_name) = field.file_name().map(|s: &str| s.to_string()) else {
            continue;
        };
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        let content_type = field
            .content_type()
            .map(|s: &str| s.to_string())
            .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file data", e))?;

        batch.push(ReceivedFile {
            field: field_name,
            original_name,
            content_type,
            data,
        });
    }

    Ok(batch)
}

#[utoipa::path(
    post,
    path = "/api/cases/{id}/media",
    tag = "media",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body(
        content_type = "multipart/form-data",
        description = "Files in `images`/`images[]` and `videos`/`videos[]` fields"
    ),
    responses(
        (status = 200, description = "Batch processed; see warnings for skipped files", body = AttachMediaResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(case_id = %id, operation = "attach_media"))]
pub async fn attach_media(
    State(state): State<Arc<AppState>>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<AttachMediaResponse>, HttpAppError> {
    state.ingestion.ensure_case(id).await?;

    let batch = read_batch(&mut multipart).await?;
    let response = state.ingestion.attach_media(id, batch).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/cases/{id}/media/{media_id}",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Case ID"),
        ("media_id" = Uuid, Path, description = "Media ID")
    ),
    responses(
        (status = 200, description = "Media removed", body = DeleteMediaResponse),
        (status = 404, description = "Case or media not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(case_id = %id, media_id = %media_id, operation = "delete_media"))]
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    ValidatedPath((id, media_id)): ValidatedPath<(Uuid, Uuid)>,
) -> Result<Json<DeleteMediaResponse>, HttpAppError> {
    let case = state.cases.delete_media(id, media_id).await?;
    Ok(Json(DeleteMediaResponse {
        success: true,
        case,
    }))
}
