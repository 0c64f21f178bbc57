//! Appointment booking and lifecycle.

use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{AppointmentRes, ErrorRes, NewAppointmentReq, UpdateAppointmentReq};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    post,
    path = "/appointments",
    security(("bearer" = [])),
    request_body = NewAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 400, description = "Invalid or past time", body = ErrorRes),
        (status = 403, description = "Caller is not a patient", body = ErrorRes),
        (status = 404, description = "Unknown therapist", body = ErrorRes)
    )
)]
/// Book an appointment with a therapist. The therapist is notified.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<NewAppointmentReq>,
) -> ApiResult<(StatusCode, Json<AppointmentRes>)> {
    let appointment = state.core.appointments.create(&caller, req.try_into()?)?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

#[utoipa::path(
    get,
    path = "/appointments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Appointments visible to the caller, soonest first", body = [AppointmentRes])
    )
)]
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<AppointmentRes>>> {
    let appointments = state.core.appointments.list(&caller)?;
    Ok(Json(
        appointments.into_iter().map(AppointmentRes::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment", body = AppointmentRes),
        (status = 404, description = "No such appointment visible to the caller", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<AppointmentRes>> {
    let appointment = state.core.appointments.get(&caller, record_id(&id)?)?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentReq,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentRes),
        (status = 400, description = "Disallowed status change", body = ErrorRes),
        (status = 403, description = "Caller is not the appointment's therapist", body = ErrorRes),
        (status = 404, description = "No such appointment", body = ErrorRes)
    )
)]
/// Change status, notes or time. A new time marks the appointment rescheduled.
#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateAppointmentReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let id = record_id(&id)?;
    let appointment = state
        .core
        .appointments
        .update(&caller, id, req.try_into()?)?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/appointments/{id}/cancel",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentRes),
        (status = 400, description = "Appointment already finished", body = ErrorRes),
        (status = 403, description = "Caller is not a participant", body = ErrorRes),
        (status = 404, description = "No such appointment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<AppointmentRes>> {
    let appointment = state.core.appointments.cancel(&caller, record_id(&id)?)?;
    Ok(Json(appointment.into()))
}
