// src/handlers/departments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        auth::Principal,
        departments::{AddMemberPayload, Department, DepartmentPayload, DepartmentWithMembers},
    },
};

// ---
// Catálogo (cualquier usuario con sesión)
// ---

#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "Departments",
    security(("api_jwt" = [])),
    responses((status = 200, description = "Departamentos activos", body = Vec<Department>))
)]
pub async fn list_active_departments(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let departments = app_state
        .department_service
        .list(false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(departments))
}

// ---
// Administración
// ---

#[utoipa::path(
    get,
    path = "/api/admin/departments",
    tag = "Admin",
    security(("api_jwt" = [])),
    responses((status = 200, description = "Todos los departamentos, inactivos incluidos", body = Vec<Department>))
)]
pub async fn list_departments(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let departments = app_state
        .department_service
        .list(true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(departments))
}

#[utoipa::path(
    post,
    path = "/api/admin/departments",
    tag = "Admin",
    security(("api_jwt" = [])),
    request_body = DepartmentPayload,
    responses((status = 201, description = "Departamento creado", body = Department))
)]
pub async fn create_department(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<DepartmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let department = app_state
        .department_service
        .create(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    put,
    path = "/api/admin/departments/{id}",
    tag = "Admin",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Departamento actualizado", body = Department),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_department(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<DepartmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let department = app_state
        .department_service
        .update(id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(department))
}

#[utoipa::path(
    delete,
    path = "/api/admin/departments/{id}",
    tag = "Admin",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Departamento desactivado"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_department(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .department_service
        .deactivate(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Jefatura de departamento
// ---

#[utoipa::path(
    get,
    path = "/api/my-department",
    tag = "Departments",
    security(("api_jwt" = [])),
    responses(
        (status = 200, description = "Departamento del jefe y sus miembros", body = DepartmentWithMembers),
        (status = 403, description = "No eres jefe de departamento")
    )
)]
pub async fn my_department(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let department = app_state
        .department_service
        .my_department(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(department))
}

#[utoipa::path(
    post,
    path = "/api/my-department/members",
    tag = "Departments",
    security(("api_jwt" = [])),
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Miembro añadido", body = Principal),
        (status = 400, description = "Ya es miembro"),
        (status = 404, description = "Correo desconocido")
    )
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .department_service
        .add_member(&user, &payload.email)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/api/my-department/members/{uid}",
    tag = "Departments",
    security(("api_jwt" = [])),
    params(("uid" = String, Path)),
    responses(
        (status = 204, description = "Miembro retirado"),
        (status = 404, description = "No es miembro de tu departamento")
    )
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .department_service
        .remove_member(&user, &uid)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}
