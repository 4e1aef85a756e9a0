//! # API REST
//!
//! REST API for recording and reading vital signs with openEHR transparency.
//!
//! Handles:
//! - HTTP endpoints with axum, mounted under `/api/observations`
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (status codes, JSON errors, CORS)
//!
//! All domain behaviour lives in `vitals-core`; handlers only translate between HTTP and
//! [`VitalSignsService`].

#![warn(rust_2018_idioms)]

mod handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use vitals_core::{StoreError, VitalSignsService, VitalsError};

pub use handlers::WRITE_STATUS_HEADER;

/// Prefix under which the observation routes are mounted.
pub const OBSERVATIONS_PREFIX: &str = "/api/observations";

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<VitalSignsService>,
}

impl AppState {
    pub fn new(service: Arc<VitalSignsService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

/// An error response with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl From<VitalsError> for ApiError {
    fn from(err: VitalsError) -> Self {
        let status = match &err {
            VitalsError::Validation(_) | VitalsError::InvalidId(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            VitalsError::PatientNotFound(_) | VitalsError::Store(StoreError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            VitalsError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            VitalsError::Config(_) | VitalsError::Registry(_) | VitalsError::RegistryRead { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %err, status = status.as_u16(), "request failed");
        }

        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorRes { detail: self.detail })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::record_vital_signs,
        handlers::list_vital_signs,
        handlers::get_vital_signs,
        handlers::delete_vital_signs,
        handlers::list_templates,
        handlers::get_template,
        handlers::get_raw_composition,
        handlers::get_composition_paths,
        handlers::get_archetype_info,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        vitals_core::models::VitalSignsCreate,
        vitals_core::models::VitalSignsResponse,
        vitals_core::models::VitalSignsListResponse,
        vitals_core::models::RawCompositionResponse,
        vitals_core::models::CompositionPath,
        vitals_core::models::CompositionPathsResponse,
        vitals_core::models::TemplateInfo,
        vitals_core::models::TemplateListResponse,
        vitals_core::models::TemplateExampleResponse,
        vitals_core::CompositionFormat,
        openehr::OpenEhrMetadata,
        openehr::PathMappingEntry,
        openehr::ArchetypeInfo,
    ))
)]
pub struct ApiDoc;

/// Observation routes, relative to [`OBSERVATIONS_PREFIX`].
fn observation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/vital-signs",
            get(handlers::list_vital_signs).post(handlers::record_vital_signs),
        )
        .route(
            "/vital-signs/:composition_uid",
            get(handlers::get_vital_signs).delete(handlers::delete_vital_signs),
        )
        .route("/openehr/templates", get(handlers::list_templates))
        .route("/openehr/templates/:template_id", get(handlers::get_template))
        .route(
            "/openehr/compositions/:composition_uid",
            get(handlers::get_raw_composition),
        )
        .route(
            "/openehr/compositions/:composition_uid/paths",
            get(handlers::get_composition_paths),
        )
        .route(
            "/openehr/archetypes/:archetype_id",
            get(handlers::get_archetype_info),
        )
}

/// The complete application router, including Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(OBSERVATIONS_PREFIX, observation_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
