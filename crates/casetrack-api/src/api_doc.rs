//! OpenAPI documentation served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::identity;
use casetrack_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Casetrack API",
        version = "0.1.0",
        description = "Crime case records with photo and video evidence. Evidence is stored through a fallback chain (file-hosting API, object storage, local disk)."
    ),
    paths(
        handlers::cases::list_cases,
        handlers::cases::get_case,
        handlers::cases::create_case,
        handlers::cases::update_case,
        handlers::cases::delete_case,
        handlers::media::attach_media,
        handlers::media::delete_media,
        handlers::catalog::crime_types,
        handlers::auth::sign_in,
        handlers::auth::sign_up,
        handlers::auth::reset_password,
        handlers::auth::sign_out,
        handlers::auth::create_user,
        handlers::auth::confirm_user,
        handlers::health::health_check,
    ),
    components(schemas(
        models::CrimeCase,
        models::CaseStatus,
        models::CaseInput,
        models::CaseMedia,
        models::MediaKind,
        models::AttachMediaResponse,
        models::DeleteResponse,
        models::DeleteMediaResponse,
        models::UploadWarning,
        models::RejectedUpload,
        models::RejectReason,
        casetrack_core::StorageBackend,
        identity::AuthSession,
        identity::IdentityUser,
        handlers::auth::SignInRequest,
        handlers::auth::SignUpRequest,
        handlers::auth::EmailRequest,
        handlers::auth::CreateUserRequest,
        handlers::auth::SignUpResponse,
        handlers::auth::UserResponse,
        handlers::auth::AckResponse,
        handlers::health::HealthResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "cases", description = "Case records"),
        (name = "media", description = "Evidence attached to cases"),
        (name = "catalog", description = "Reference data"),
        (name = "auth", description = "Identity provider adapter"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
