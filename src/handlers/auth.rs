// src/handlers/auth.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        auth::{AuthResponse, LoginPayload, Principal},
        modules::ModuleVisibility,
    },
    services::visibility::Permissions,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub principal: Principal,
    pub permissions: Permissions,
    pub modules: Vec<ModuleVisibility>,
}

// Handler de login: canjea el ID token del proveedor por un token de sesión
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Sesión iniciada", body = AuthResponse),
        (status = 401, description = "Credencial del proveedor inválida"),
        (status = 403, description = "Correo no admitido (dominio o cuenta de alumnado)")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .sign_in(&payload.id_token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(response))
}

// /me: perfil, permisos y módulos
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("api_jwt" = [])),
    responses(
        (status = 200, description = "Usuario actual", body = MeResponse),
        (status = 401, description = "Sin sesión")
    )
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let modules = app_state
        .visibility_service
        .modules_for(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(MeResponse {
        permissions: Permissions::for_principal(&user),
        principal: user,
        modules,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/me/modules",
    tag = "Users",
    security(("api_jwt" = [])),
    responses(
        (status = 200, description = "Módulos de navegación", body = Vec<ModuleVisibility>)
    )
)]
pub async fn get_my_modules(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let modules = app_state
        .visibility_service
        .modules_for(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(modules))
}
