// src/handlers/admin.rs

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        auth::{LoginAuditEntry, Principal, UpdateUserPayload},
        modules::{ModuleConfig, ModuleKey, VisibilityState},
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    /// Por defecto 100
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("api_jwt" = [])),
    responses((status = 200, description = "Todos los perfiles", body = Vec<Principal>))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let users = app_state
        .user_service
        .list_users()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(users))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{uid}",
    tag = "Admin",
    security(("api_jwt" = [])),
    params(("uid" = String, Path, description = "Identificador del usuario")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "Perfil actualizado", body = Principal),
        (status = 404, description = "Usuario o departamento inexistente")
    )
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .user_service
        .update_user(&uid, &payload, &admin)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(updated))
}

#[utoipa::path(
    get,
    path = "/api/admin/login-audit",
    tag = "Admin",
    security(("api_jwt" = [])),
    params(AuditQuery),
    responses((status = 200, description = "Accesos recientes", body = Vec<LoginAuditEntry>))
)]
pub async fn login_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .user_service
        .login_audit(query.limit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/admin/modules",
    tag = "Admin",
    security(("api_jwt" = [])),
    responses((status = 200, description = "Estado de cada módulo", body = ModuleConfig))
)]
pub async fn get_modules(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let config = app_state
        .visibility_service
        .config()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Se devuelven todas las claves, también las que usan el valor por defecto
    let full: BTreeMap<ModuleKey, VisibilityState> =
        ModuleKey::ALL.iter().map(|&key| (key, config.state(key))).collect();
    Ok(Json(ModuleConfig(full)))
}

#[utoipa::path(
    put,
    path = "/api/admin/modules",
    tag = "Admin",
    security(("api_jwt" = [])),
    request_body = ModuleConfig,
    responses((status = 200, description = "Configuración resultante", body = ModuleConfig))
)]
pub async fn update_modules(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(admin): AuthenticatedUser,
    Json(changes): Json<ModuleConfig>,
) -> Result<impl IntoResponse, ApiError> {
    let config = app_state
        .visibility_service
        .update(changes.0, &admin.uid)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(config))
}
