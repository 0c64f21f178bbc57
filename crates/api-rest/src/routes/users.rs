//! Registration, the admin user directory and the caller's own profile.

use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{
    ErrorRes, RegisterReq, TherapistRes, UpdateProfileReq, UpdateUserReq, UserRes,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = UserRes),
        (status = 400, description = "Invalid role, name or email", body = ErrorRes),
        (status = 403, description = "Admin accounts cannot self-register", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes)
    )
)]
/// Register a patient or therapist profile. Every admin is notified.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterReq>,
) -> ApiResult<(StatusCode, Json<UserRes>)> {
    let user = state.core.users.register(req.try_into()?)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users, oldest first", body = [UserRes]),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 403, description = "Caller is not an admin", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<UserRes>>> {
    let users = state.core.users.list(&caller)?;
    Ok(Json(users.into_iter().map(UserRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users/therapists",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Therapist directory", body = [TherapistRes]),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
/// Names and ids of every therapist, for booking and starting conversations.
#[axum::debug_handler]
pub async fn therapist_directory(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<TherapistRes>>> {
    let therapists = state.core.users.therapist_directory(&caller)?;
    Ok(Json(therapists.into_iter().map(TherapistRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users/me",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's profile", body = UserRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<UserRes>> {
    Ok(Json(state.core.users.me(&caller)?.into()))
}

#[utoipa::path(
    put,
    path = "/users/me",
    security(("bearer" = [])),
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Profile updated", body = UserRes),
        (status = 400, description = "Invalid name or email", body = ErrorRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes)
    )
)]
/// Update the caller's own name or email. The role can never be changed here.
#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<UpdateProfileReq>,
) -> ApiResult<Json<UserRes>> {
    let user = state.core.users.update_me(&caller, req.try_into()?)?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserRes),
        (status = 403, description = "Caller is not an admin", body = ErrorRes),
        (status = 404, description = "No such user", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserRes>> {
    let user = state.core.users.get(&caller, record_id(&id)?)?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserReq,
    responses(
        (status = 200, description = "User updated", body = UserRes),
        (status = 400, description = "Invalid field", body = ErrorRes),
        (status = 403, description = "Caller is not an admin", body = ErrorRes),
        (status = 404, description = "No such user", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes)
    )
)]
/// Admin update. A role change also removes the user from every assignment.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserReq>,
) -> ApiResult<Json<UserRes>> {
    let id = record_id(&id)?;
    let user = state.core.users.update(&caller, id, req.try_into()?)?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Caller is not an admin", body = ErrorRes),
        (status = 404, description = "No such user", body = ErrorRes)
    )
)]
/// Delete a user and their assignment edges. Other records they own are left in place.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.core.users.delete(&caller, record_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}
