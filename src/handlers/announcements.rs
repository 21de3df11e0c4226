// src/handlers/announcements.rs

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
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        modules::{AnnouncementsModule, RequireModule},
    },
    models::announcements::{Announcement, CreateAnnouncementPayload},
};

#[utoipa::path(
    get,
    path = "/api/announcements",
    tag = "Announcements",
    security(("api_jwt" = [])),
    responses((status = 200, description = "Anuncios dirigidos al usuario, más recientes primero", body = Vec<Announcement>))
)]
pub async fn list_announcements(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<AnnouncementsModule>,
) -> Result<impl IntoResponse, ApiError> {
    let announcements = app_state
        .announcement_service
        .list(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(announcements))
}

#[utoipa::path(
    post,
    path = "/api/announcements",
    tag = "Announcements",
    security(("api_jwt" = [])),
    request_body = CreateAnnouncementPayload,
    responses(
        (status = 201, description = "Anuncio publicado", body = Announcement),
        (status = 403, description = "Sin permiso de publicación")
    )
)]
pub async fn create_announcement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<AnnouncementsModule>,
    Json(payload): Json<CreateAnnouncementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let announcement = app_state
        .announcement_service
        .create(&payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    tag = "Announcements",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Anuncio eliminado"),
        (status = 403, description = "Ni autor ni administrador"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_announcement(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<AnnouncementsModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .announcement_service
        .delete(id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}
