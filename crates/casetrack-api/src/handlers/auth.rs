//! Identity endpoints. Each answers 503 when no identity service is configured.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::identity::identifier_to_email;
use crate::services::{AuthSession, IdentityProvider, IdentityUser};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use casetrack_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    /// Email address or bare username
    #[validate(length(min = 1))]
    pub identifier: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmailRequest {
    #[validate(length(min = 1))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub username: String,
    /// Defaults to `{username}@local.invalid`
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignUpResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSession>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: IdentityUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    pub success: bool,
}

fn provider(state: &AppState) -> Result<&Arc<dyn IdentityProvider>, AppError> {
    state.identity.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Identity provider is not configured".to_string())
    })
}

fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthSession),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    )
)]
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SignInRequest>,
) -> Result<Json<AuthSession>, HttpAppError> {
    let identity = provider(&state)?;
    body.validate().map_err(AppError::from)?;
    Ok(Json(identity.sign_in(&body.identifier, &body.password).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account registered", body = SignUpResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    )
)]
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SignUpRequest>,
) -> Result<Json<SignUpResponse>, HttpAppError> {
    let identity = provider(&state)?;
    body.validate().map_err(AppError::from)?;

    let session = identity.sign_up(&body.email, &body.password).await?;
    // Accounts are usable without clicking the confirmation mail.
    if let Err(e) = identity.confirm_user(&body.email).await {
        tracing::warn!(error = %e, "Auto-confirm after sign-up failed");
    }

    Ok(Json(SignUpResponse {
        success: true,
        session,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Recovery mail requested", body = AckResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<EmailRequest>,
) -> Result<Json<AckResponse>, HttpAppError> {
    let identity = provider(&state)?;
    body.validate().map_err(AppError::from)?;
    identity.reset_password(&body.email).await?;
    Ok(Json(AckResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    tag = "auth",
    responses(
        (status = 200, description = "Session revoked", body = AckResponse),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    )
)]
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, HttpAppError> {
    let identity = provider(&state)?;
    let token = bearer_token(&headers)?;
    identity.sign_out(&token).await?;
    Ok(Json(AckResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/api/auth/create",
    tag = "auth",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created and confirmed", body = UserResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<Json<UserResponse>, HttpAppError> {
    let identity = provider(&state)?;
    body.validate().map_err(AppError::from)?;

    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .unwrap_or_else(|| identifier_to_email(&body.username));
    let user = identity
        .create_user(&body.username, &email, &body.password)
        .await?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/confirm",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Email marked as confirmed", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    )
)]
pub async fn confirm_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<EmailRequest>,
) -> Result<Json<UserResponse>, HttpAppError> {
    let identity = provider(&state)?;
    body.validate().map_err(AppError::from)?;
    let user = identity.confirm_user(&body.email).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}
