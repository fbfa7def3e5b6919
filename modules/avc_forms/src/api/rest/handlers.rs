use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::auth::Authenticated;
use crate::api::rest::dto::{
    CreatePatientReq, CreateUserReq, ListQuery, PatientDto, PatientListDto, ReplacePatientReq,
    ReplaceUserReq, UpdatePatientReq, UpdateUserReq, UserDto, UserListDto,
};
use crate::api::rest::error::{from_parts, map_domain_error, validation_problem};
use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::identity::Identity;
use crate::domain::policy::{require, PatientPermission};
use crate::domain::service::{PatientsService, UsersService};

// --- extractor rejections ---

fn body<T>(payload: Result<Json<T>, JsonRejection>, instance: &str) -> Result<T, ProblemResponse> {
    payload.map(|Json(v)| v).map_err(|rej| {
        info!("Rejected request body: {}", rej.body_text());
        validation_problem("body", &rej.body_text(), instance)
    })
}

/// Model permissions are checked before the body is looked at.
fn authorize(
    ctx: &Identity,
    perm: PatientPermission,
    instance: &str,
) -> Result<(), ProblemResponse> {
    require(ctx, perm).map_err(|e| map_domain_error(&e, instance))
}

fn page_query(
    query: Result<Query<ListQuery>, QueryRejection>,
    instance: &str,
) -> Result<ListQuery, ProblemResponse> {
    query
        .map(|Query(q)| q)
        .map_err(|rej| validation_problem("query", &rej.body_text(), instance))
}

/// A malformed id can never match a row, so it is reported as not found.
fn path_id(
    path: Result<Path<Uuid>, PathRejection>,
    code: &str,
    title: &str,
    instance: &str,
) -> Result<Uuid, ProblemResponse> {
    path.map(|Path(id)| id).map_err(|rej| {
        from_parts(StatusCode::NOT_FOUND, code, title, rej.body_text(), instance)
    })
}

fn user_id(path: Result<Path<Uuid>, PathRejection>, instance: &str) -> Result<Uuid, ProblemResponse> {
    path_id(path, "AVC_USER_NOT_FOUND", "User not found", instance)
}

fn patient_id(
    path: Result<Path<Uuid>, PathRejection>,
    instance: &str,
) -> Result<Uuid, ProblemResponse> {
    path_id(path, "AVC_PATIENT_NOT_FOUND", "Patient not found", instance)
}

// --- users ---

/// List users, newest `date_joined` first
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    operation_id = "avc_forms.list_users",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListDto),
        (status = 401, description = "Unauthenticated", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn list_users(
    Extension(svc): Extension<Arc<UsersService>>,
    Authenticated(ctx): Authenticated,
    query: Result<Query<ListQuery>, QueryRejection>,
    uri: Uri,
) -> Result<Json<UserListDto>, ProblemResponse> {
    let query = page_query(query, uri.path())?;
    info!("Listing users for {} with query: {:?}", ctx.username(), query);

    match svc.list_users(query.into()).await {
        Ok(page) => Ok(Json(UserListDto::from(page))),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    operation_id = "avc_forms.get_user",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_user(
    Extension(svc): Extension<Arc<UsersService>>,
    Authenticated(_ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = user_id(path, uri.path())?;
    info!("Getting user with id: {}", id);

    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    operation_id = "avc_forms.create_user",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Created user", body = UserDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn create_user(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    Authenticated(ctx): Authenticated,
    payload: Result<Json<CreateUserReq>, JsonRejection>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    let req_body = body(payload, uri.path())?;
    info!("{} creating user '{}'", ctx.username(), req_body.username);

    match svc.create_user(req_body.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            error!("Failed to create user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Replace a user's editable fields
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    operation_id = "avc_forms.replace_user",
    params(("id" = Uuid, Path, description = "User UUID")),
    request_body = ReplaceUserReq,
    responses(
        (status = 200, description = "Updated user", body = UserDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn replace_user(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    Authenticated(_ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReplaceUserReq>, JsonRejection>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = user_id(path, uri.path())?;
    let req_body = body(payload, uri.path())?;
    info!("Replacing user {}", id);

    match svc.update_user(id, req_body.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to replace user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Partially update a user
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    operation_id = "avc_forms.update_user",
    params(("id" = Uuid, Path, description = "User UUID")),
    request_body = UpdateUserReq,
    responses(
        (status = 200, description = "Updated user", body = UserDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn update_user(
    uri: Uri,
    Extension(svc): Extension<Arc<UsersService>>,
    Authenticated(_ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserReq>, JsonRejection>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = user_id(path, uri.path())?;
    let req_body = body(payload, uri.path())?;
    info!("Updating user {}", id);

    match svc.update_user(id, req_body.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to update user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete a user. Patients it owns keep existing with `owner` cleared.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    operation_id = "avc_forms.delete_user",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "User still referenced by patients", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn delete_user(
    Extension(svc): Extension<Arc<UsersService>>,
    Authenticated(ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    let id = user_id(path, uri.path())?;
    info!("{} deleting user {}", ctx.username(), id);

    match svc.delete_user(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

// --- patients ---

/// List patients visible to the requester
#[utoipa::path(
    get,
    path = "/patients",
    tag = "patients",
    operation_id = "avc_forms.list_patients",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of patients", body = PatientListDto),
        (status = 401, description = "Unauthenticated", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn list_patients(
    Extension(svc): Extension<Arc<PatientsService>>,
    Authenticated(ctx): Authenticated,
    query: Result<Query<ListQuery>, QueryRejection>,
    uri: Uri,
) -> Result<Json<PatientListDto>, ProblemResponse> {
    let query = page_query(query, uri.path())?;
    info!("Listing patients with query: {:?}", query);

    match svc.list_patients(&ctx, query.into()).await {
        Ok(page) => Ok(Json(PatientListDto::from(page))),
        Err(e) => {
            error!("Failed to list patients: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a patient by id
#[utoipa::path(
    get,
    path = "/patients/{id}",
    tag = "patients",
    operation_id = "avc_forms.get_patient",
    params(("id" = Uuid, Path, description = "Patient UUID")),
    responses(
        (status = 200, description = "Patient found", body = PatientDto),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_patient(
    Extension(svc): Extension<Arc<PatientsService>>,
    Authenticated(ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
) -> Result<Json<PatientDto>, ProblemResponse> {
    let id = patient_id(path, uri.path())?;
    info!("Getting patient with id: {}", id);

    match svc.get_patient(&ctx, id).await {
        Ok(patient) => Ok(Json(PatientDto::from(patient))),
        Err(e) => {
            error!("Failed to get patient {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Create a patient; the requester becomes its creator and last updater
#[utoipa::path(
    post,
    path = "/patients",
    tag = "patients",
    operation_id = "avc_forms.create_patient",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Created patient", body = PatientDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 403, description = "Missing add_patient", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn create_patient(
    uri: Uri,
    Extension(svc): Extension<Arc<PatientsService>>,
    Authenticated(ctx): Authenticated,
    payload: Result<Json<CreatePatientReq>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientDto>), ProblemResponse> {
    authorize(&ctx, PatientPermission::Add, uri.path())?;
    let req_body = body(payload, uri.path())?;
    info!("Creating patient: {:?}", req_body.code);

    match svc.create_patient(&ctx, req_body.into()).await {
        Ok(patient) => Ok((StatusCode::CREATED, Json(PatientDto::from(patient)))),
        Err(e) => {
            error!("Failed to create patient: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Replace a patient's writable fields
#[utoipa::path(
    put,
    path = "/patients/{id}",
    tag = "patients",
    operation_id = "avc_forms.replace_patient",
    params(("id" = Uuid, Path, description = "Patient UUID")),
    request_body = ReplacePatientReq,
    responses(
        (status = 200, description = "Updated patient", body = PatientDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 403, description = "Missing change_patient", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn replace_patient(
    uri: Uri,
    Extension(svc): Extension<Arc<PatientsService>>,
    Authenticated(ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReplacePatientReq>, JsonRejection>,
) -> Result<Json<PatientDto>, ProblemResponse> {
    authorize(&ctx, PatientPermission::Change, uri.path())?;
    let id = patient_id(path, uri.path())?;
    let req_body = body(payload, uri.path())?;
    info!("Replacing patient {}", id);

    match svc.update_patient(&ctx, id, req_body.into()).await {
        Ok(patient) => Ok(Json(PatientDto::from(patient))),
        Err(e) => {
            error!("Failed to replace patient {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Partially update a patient
#[utoipa::path(
    patch,
    path = "/patients/{id}",
    tag = "patients",
    operation_id = "avc_forms.update_patient",
    params(("id" = Uuid, Path, description = "Patient UUID")),
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Updated patient", body = PatientDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 403, description = "Missing change_patient", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn update_patient(
    uri: Uri,
    Extension(svc): Extension<Arc<PatientsService>>,
    Authenticated(ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePatientReq>, JsonRejection>,
) -> Result<Json<PatientDto>, ProblemResponse> {
    authorize(&ctx, PatientPermission::Change, uri.path())?;
    let id = patient_id(path, uri.path())?;
    let req_body = body(payload, uri.path())?;
    info!("Updating patient {}", id);

    match svc.update_patient(&ctx, id, req_body.into()).await {
        Ok(patient) => Ok(Json(PatientDto::from(patient))),
        Err(e) => {
            error!("Failed to update patient {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete a patient
#[utoipa::path(
    delete,
    path = "/patients/{id}",
    tag = "patients",
    operation_id = "avc_forms.delete_patient",
    params(("id" = Uuid, Path, description = "Patient UUID")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 401, description = "Unauthenticated", body = Problem),
        (status = 403, description = "Missing delete_patient", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    ),
    security(("basic_auth" = []))
)]
pub async fn delete_patient(
    Extension(svc): Extension<Arc<PatientsService>>,
    Authenticated(ctx): Authenticated,
    path: Result<Path<Uuid>, PathRejection>,
    uri: Uri,
) -> Result<StatusCode, ProblemResponse> {
    authorize(&ctx, PatientPermission::Delete, uri.path())?;
    let id = patient_id(path, uri.path())?;
    info!("Deleting patient: {}", id);

    match svc.delete_patient(&ctx, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete patient {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
