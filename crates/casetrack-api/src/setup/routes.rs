//! Route configuration and setup.

use crate::handlers::{auth, cases, catalog, health, media};
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use casetrack_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config);
    let uploads = config.uploads();

    let api = Router::new()
        .route("/cases", get(cases::list_cases).post(cases::create_case))
        .route(
            "/cases/{id}",
            get(cases::get_case)
                .put(cases::update_case)
                .delete(cases::delete_case),
        )
        .route("/cases/{id}/media", post(media::attach_media))
        .route("/cases/{id}/media/{media_id}", delete(media::delete_media))
        .route("/catalog/crime-types", get(catalog::crime_types))
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/create", post(auth::create_user))
        .route("/auth/confirm", post(auth::confirm_user));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .nest_service(&uploads.url_prefix, ServeDir::new(&uploads.dir))
        .layer(RequestBodyLimitLayer::new(max_request_bytes(config)))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Largest batch the per-kind caps allow.
fn max_request_bytes(config: &Config) -> usize {
    let uploads = config.uploads();
    uploads
        .max_image_size_bytes
        .saturating_mul(uploads.max_images_per_request)
        .saturating_add(
            uploads
                .max_video_size_bytes
                .saturating_mul(uploads.max_videos_per_request),
        )
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins()
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
