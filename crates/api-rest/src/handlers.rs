//! HTTP handlers for the observation routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use openehr::ArchetypeInfo;
use serde::Deserialize;
use utoipa::IntoParams;
use vitals_core::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use vitals_core::models::{
    deserialize_optional_utc, CompositionPathsResponse, RawCompositionResponse, TemplateExampleResponse,
    TemplateListResponse, VitalSignsCreate, VitalSignsListResponse, VitalSignsResponse,
};
use vitals_core::{CompositionFormat, VitalsError};
use vitals_types::{CompositionUid, PatientId, TemplateId};

use crate::{ApiError, ApiResult, AppState, ErrorRes, HealthRes};

/// Response header telling the caller whether a write reached the clinical-data server.
pub const WRITE_STATUS_HEADER: &str = "x-openehr-write";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct ListParams {
    /// Patient ID
    patient_id: String,
    /// Start of the recording-time window (used only together with `to_date`)
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    from_date: Option<DateTime<Utc>>,
    /// End of the recording-time window (used only together with `from_date`)
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    to_date: Option<DateTime<Utc>>,
    /// Pagination offset (default 0)
    skip: Option<i64>,
    /// Page size, 1-1000 (default 100)
    limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct PatientParams {
    /// Patient ID for EHR lookup
    patient_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct CompositionParams {
    /// Patient ID for EHR lookup
    patient_id: String,
    /// Composition format (default FLAT)
    format: Option<CompositionFormat>,
}

fn pagination(skip: Option<i64>, limit: Option<i64>) -> ApiResult<(usize, usize)> {
    let skip = match skip {
        None => 0,
        Some(s) => usize::try_from(s)
            .map_err(|_| ApiError::bad_request(format!("skip must be >= 0, got {s}")))?,
    };
    let limit = match limit {
        None => DEFAULT_LIST_LIMIT,
        Some(l) => usize::try_from(l)
            .ok()
            .filter(|l| (1..=MAX_LIST_LIMIT).contains(l))
            .ok_or_else(|| {
                ApiError::bad_request(format!(
                    "limit must be between 1 and {MAX_LIST_LIMIT}, got {l}"
                ))
            })?,
    };
    Ok((skip, limit))
}

fn parse_patient_id(raw: &str) -> ApiResult<PatientId> {
    PatientId::new(raw).map_err(|e| VitalsError::from(e).into())
}

fn parse_composition_uid(raw: &str) -> ApiResult<CompositionUid> {
    CompositionUid::new(raw).map_err(|e| VitalsError::from(e).into())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Does not contact the clinical-data
/// server.
#[axum::debug_handler]
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Vital signs REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/observations/vital-signs",
    request_body = VitalSignsCreate,
    responses(
        (status = 201, description = "Vital signs recorded (check the x-openehr-write header)", body = VitalSignsResponse),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 422, description = "Validation failed", body = ErrorRes)
    )
)]
/// Record vital signs for a patient
///
/// Submits a FLAT composition to the clinical-data server. If the server is unavailable or
/// rejects the composition, the reading is still returned under a `pending::` placeholder id and
/// the `x-openehr-write` header is `degraded`.
#[axum::debug_handler]
pub(crate) async fn record_vital_signs(
    State(state): State<AppState>,
    Json(req): Json<VitalSignsCreate>,
) -> ApiResult<impl IntoResponse> {
    let recorded = state.service.record(req).await?;
    let write_status = if recorded.outcome.is_degraded() {
        "degraded"
    } else {
        "stored"
    };
    Ok((
        StatusCode::CREATED,
        [(WRITE_STATUS_HEADER, write_status)],
        Json(recorded.response),
    ))
}

#[utoipa::path(
    get,
    path = "/api/observations/vital-signs",
    params(ListParams),
    responses(
        (status = 200, description = "Paginated vital signs, newest first", body = VitalSignsListResponse),
        (status = 400, description = "Invalid pagination", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
/// List vital signs for a patient
#[axum::debug_handler]
pub(crate) async fn list_vital_signs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<VitalSignsListResponse>> {
    let (skip, limit) = pagination(params.skip, params.limit)?;
    let patient_id = parse_patient_id(&params.patient_id)?;
    let page = state
        .service
        .list(&patient_id, params.from_date, params.to_date, skip, limit)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/observations/vital-signs/{composition_uid}",
    params(("composition_uid" = String, Path, description = "Composition UID"), PatientParams),
    responses(
        (status = 200, description = "Vital signs reading", body = VitalSignsResponse),
        (status = 404, description = "Vital signs not found", body = ErrorRes)
    )
)]
/// Get a single vital signs reading by composition UID
#[axum::debug_handler]
pub(crate) async fn get_vital_signs(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<PatientParams>,
) -> ApiResult<Json<VitalSignsResponse>> {
    let uid = parse_composition_uid(&uid)?;
    let patient_id = parse_patient_id(&params.patient_id)?;
    state
        .service
        .get(&uid, &patient_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Vital signs not found"))
}

#[utoipa::path(
    delete,
    path = "/api/observations/vital-signs/{composition_uid}",
    params(("composition_uid" = String, Path, description = "Composition UID"), PatientParams),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Vital signs not found or delete failed", body = ErrorRes)
    )
)]
/// Delete a vital signs composition
#[axum::debug_handler]
pub(crate) async fn delete_vital_signs(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<PatientParams>,
) -> ApiResult<StatusCode> {
    let uid = parse_composition_uid(&uid)?;
    let patient_id = parse_patient_id(&params.patient_id)?;
    if state.service.delete(&uid, &patient_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Vital signs not found or delete failed"))
    }
}

#[utoipa::path(
    get,
    path = "/api/observations/openehr/templates",
    responses(
        (status = 200, description = "Operational templates on the clinical-data server", body = TemplateListResponse),
        (status = 503, description = "Clinical-data server unavailable", body = ErrorRes)
    )
)]
/// List the operational templates known to the clinical-data server
#[axum::debug_handler]
pub(crate) async fn list_templates(
    State(state): State<AppState>,
) -> ApiResult<Json<TemplateListResponse>> {
    Ok(Json(state.service.list_templates().await?))
}

#[utoipa::path(
    get,
    path = "/api/observations/openehr/templates/{template_id}",
    params(("template_id" = String, Path, description = "Operational template id")),
    responses(
        (status = 200, description = "Example FLAT composition for the template", body = TemplateExampleResponse),
        (status = 404, description = "Template not found", body = ErrorRes),
        (status = 503, description = "Clinical-data server unavailable", body = ErrorRes)
    )
)]
/// Get an example FLAT composition for a template
#[axum::debug_handler]
pub(crate) async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> ApiResult<Json<TemplateExampleResponse>> {
    let template_id = TemplateId::new(&template_id).map_err(VitalsError::from)?;
    Ok(Json(state.service.template_example(&template_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/observations/openehr/compositions/{composition_uid}",
    params(("composition_uid" = String, Path, description = "Composition UID"), CompositionParams),
    responses(
        (status = 200, description = "Composition as stored", body = RawCompositionResponse),
        (status = 404, description = "Composition not found", body = ErrorRes)
    )
)]
/// Get a raw composition in FLAT or STRUCTURED format
#[axum::debug_handler]
pub(crate) async fn get_raw_composition(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<CompositionParams>,
) -> ApiResult<Json<RawCompositionResponse>> {
    let uid = parse_composition_uid(&uid)?;
    let patient_id = parse_patient_id(&params.patient_id)?;
    let format = params.format.unwrap_or_default();
    state
        .service
        .raw_composition(&uid, &patient_id, format)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Composition not found"))
}

#[utoipa::path(
    get,
    path = "/api/observations/openehr/compositions/{composition_uid}/paths",
    params(("composition_uid" = String, Path, description = "Composition UID"), PatientParams),
    responses(
        (status = 200, description = "Every FLAT path in the composition, sorted", body = CompositionPathsResponse),
        (status = 404, description = "Composition not found", body = ErrorRes)
    )
)]
/// List every path and value in a composition
#[axum::debug_handler]
pub(crate) async fn get_composition_paths(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<PatientParams>,
) -> ApiResult<Json<CompositionPathsResponse>> {
    let uid = parse_composition_uid(&uid)?;
    let patient_id = parse_patient_id(&params.patient_id)?;
    state
        .service
        .composition_paths(&uid, &patient_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Composition not found"))
}

#[utoipa::path(
    get,
    path = "/api/observations/openehr/archetypes/{archetype_id}",
    params(("archetype_id" = String, Path, description = "Archetype id, e.g. openEHR-EHR-OBSERVATION.pulse.v1")),
    responses(
        (status = 200, description = "Archetype reference information", body = ArchetypeInfo),
        (status = 400, description = "Malformed archetype id", body = ErrorRes)
    )
)]
/// Describe an archetype, with a link to the Clinical Knowledge Manager when known
#[axum::debug_handler]
pub(crate) async fn get_archetype_info(
    Path(archetype_id): Path<String>,
) -> ApiResult<Json<ArchetypeInfo>> {
    openehr::archetype_info::lookup(&archetype_id)
        .map(Json)
        .map_err(|e| ApiError::bad_request(e.to_string()))
}
