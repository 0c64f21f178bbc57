//! The therapist-patient roster.

use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{AssignReq, AssignmentRes, ErrorRes};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    get,
    path = "/assignments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Every therapist with at least one patient", body = [AssignmentRes]),
        (status = 403, description = "Caller is not an admin", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<AssignmentRes>>> {
    let assignments = state.core.assignments.list(&caller)?;
    Ok(Json(assignments.into_iter().map(AssignmentRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/assignments/mine",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The calling therapist's patients", body = AssignmentRes),
        (status = 403, description = "Caller is not a therapist", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn my_roster(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<AssignmentRes>> {
    let roster = state.core.assignments.roster(&caller, caller.id)?;
    Ok(Json(roster.into()))
}

#[utoipa::path(
    get,
    path = "/assignments/{therapist_id}",
    security(("bearer" = [])),
    params(("therapist_id" = String, Path, description = "Therapist id")),
    responses(
        (status = 200, description = "The therapist's patients", body = AssignmentRes),
        (status = 403, description = "Caller is neither that therapist nor an admin", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_roster(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(therapist_id): Path<String>,
) -> ApiResult<Json<AssignmentRes>> {
    let roster = state
        .core
        .assignments
        .roster(&caller, record_id(&therapist_id)?)?;
    Ok(Json(roster.into()))
}

#[utoipa::path(
    put,
    path = "/assignments/{therapist_id}",
    security(("bearer" = [])),
    params(("therapist_id" = String, Path, description = "Therapist id")),
    request_body = AssignReq,
    responses(
        (status = 200, description = "Roster replaced", body = AssignmentRes),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 403, description = "Caller is not an admin", body = ErrorRes),
        (status = 404, description = "Unknown therapist or patient", body = ErrorRes),
        (status = 409, description = "A patient is held by another therapist", body = ErrorRes)
    )
)]
/// Replace a therapist's patient set. Added and removed patients are notified.
#[axum::debug_handler]
pub async fn assign(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(therapist_id): Path<String>,
    ApiJson(req): ApiJson<AssignReq>,
) -> ApiResult<Json<AssignmentRes>> {
    let therapist_id = record_id(&therapist_id)?;
    let roster = state
        .core
        .assignments
        .assign(&caller, therapist_id, req.patient_ids()?)?;
    Ok(Json(roster.into()))
}

#[utoipa::path(
    delete,
    path = "/assignments/{therapist_id}/patients/{patient_id}",
    security(("bearer" = [])),
    params(
        ("therapist_id" = String, Path, description = "Therapist id"),
        ("patient_id" = String, Path, description = "Patient id")
    ),
    responses(
        (status = 200, description = "Patient removed; remaining roster", body = AssignmentRes),
        (status = 400, description = "Patient is not assigned to this therapist", body = ErrorRes),
        (status = 403, description = "Caller is not an admin", body = ErrorRes),
        (status = 404, description = "Therapist has no patients", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn unassign(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path((therapist_id, patient_id)): Path<(String, String)>,
) -> ApiResult<Json<AssignmentRes>> {
    let roster = state.core.assignments.unassign(
        &caller,
        record_id(&therapist_id)?,
        record_id(&patient_id)?,
    )?;
    Ok(Json(roster.into()))
}
