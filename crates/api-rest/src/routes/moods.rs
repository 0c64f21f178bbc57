use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{ErrorRes, MoodLogRes, NewMoodReq};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    post,
    path = "/moods",
    security(("bearer" = [])),
    request_body = NewMoodReq,
    responses(
        (status = 201, description = "Mood logged", body = MoodLogRes),
        (status = 400, description = "Invalid mood, energy or sleep value", body = ErrorRes),
        (status = 403, description = "Caller is not a patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_mood(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<NewMoodReq>,
) -> ApiResult<(StatusCode, Json<MoodLogRes>)> {
    let log = state.core.moods.create(&caller, req.try_into()?)?;
    Ok((StatusCode::CREATED, Json(log.into())))
}

#[utoipa::path(
    get,
    path = "/moods",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The calling patient's logs, newest first", body = [MoodLogRes]),
        (status = 403, description = "Caller is not a patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_own_moods(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<MoodLogRes>>> {
    let logs = state.core.moods.list_own(&caller)?;
    Ok(Json(logs.into_iter().map(MoodLogRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/moods/patients/{patient_id}",
    security(("bearer" = [])),
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient's logs, newest first", body = [MoodLogRes]),
        (status = 404, description = "Patient not visible to the caller", body = ErrorRes)
    )
)]
/// A patient's mood history, for their assigned therapist or an admin.
#[axum::debug_handler]
pub async fn list_patient_moods(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<MoodLogRes>>> {
    let logs = state
        .core
        .moods
        .list_for_patient(&caller, record_id(&patient_id)?)?;
    Ok(Json(logs.into_iter().map(MoodLogRes::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/moods/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Mood log id")),
    responses(
        (status = 204, description = "Mood log deleted"),
        (status = 403, description = "Patients cannot delete logs", body = ErrorRes),
        (status = 404, description = "No such log visible to the caller", body = ErrorRes)
    )
)]
/// Therapists (for assigned patients) and admins only; the owning patient cannot delete.
#[axum::debug_handler]
pub async fn delete_mood(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.core.moods.delete(&caller, record_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}
