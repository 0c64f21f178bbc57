use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{ErrorRes, NewPrescriptionReq, PrescriptionRes, UpdatePrescriptionReq};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    post,
    path = "/prescriptions",
    security(("bearer" = [])),
    request_body = NewPrescriptionReq,
    responses(
        (status = 201, description = "Prescription created", body = PrescriptionRes),
        (status = 400, description = "Invalid field", body = ErrorRes),
        (status = 403, description = "Caller is not a therapist", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Prescribe for a patient. The patient is notified.
#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<NewPrescriptionReq>,
) -> ApiResult<(StatusCode, Json<PrescriptionRes>)> {
    let prescription = state.core.prescriptions.create(&caller, req.try_into()?)?;
    Ok((StatusCode::CREATED, Json(prescription.into())))
}

#[utoipa::path(
    put,
    path = "/prescriptions/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Prescription id")),
    request_body = UpdatePrescriptionReq,
    responses(
        (status = 200, description = "Prescription updated", body = PrescriptionRes),
        (status = 403, description = "Caller is not a therapist", body = ErrorRes),
        (status = 404, description = "No such prescription", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePrescriptionReq>,
) -> ApiResult<Json<PrescriptionRes>> {
    let id = record_id(&id)?;
    let prescription = state.core.prescriptions.update(&caller, id, req.into())?;
    Ok(Json(prescription.into()))
}

#[utoipa::path(
    get,
    path = "/prescriptions",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The calling patient's active prescriptions", body = [PrescriptionRes]),
        (status = 403, description = "Caller is not a patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_own_prescriptions(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<PrescriptionRes>>> {
    let prescriptions = state.core.prescriptions.list_own(&caller)?;
    Ok(Json(
        prescriptions.into_iter().map(PrescriptionRes::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/prescriptions/patients/{patient_id}",
    security(("bearer" = [])),
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient's prescriptions", body = [PrescriptionRes]),
        (status = 403, description = "Patients may only read their own", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_patient_prescriptions(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<PrescriptionRes>>> {
    let prescriptions = state
        .core
        .prescriptions
        .list_for_patient(&caller, record_id(&patient_id)?)?;
    Ok(Json(
        prescriptions.into_iter().map(PrescriptionRes::from).collect(),
    ))
}
