// src/handlers/tickets.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        auth::Principal,
        tickets::{CreateTicketPayload, Ticket, TicketStats, TicketType, UpdateTicketPayload},
    },
};

// Cada tipo de petición tiene su propio módulo
async fn ensure_module(
    app_state: &AppState,
    locale: &Locale,
    ticket_type: TicketType,
    user: &Principal,
) -> Result<(), ApiError> {
    app_state
        .visibility_service
        .ensure_access(ticket_type.module(), user)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{type}",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path, description = "tic, maintenance o threeD")),
    responses(
        (status = 200, description = "Peticiones visibles para el usuario", body = Vec<Ticket>),
        (status = 403, description = "Módulo desactivado")
    )
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(ticket_type): Path<TicketType>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_module(&app_state, &locale, ticket_type, &user).await?;

    let tickets = app_state
        .ticket_service
        .list(ticket_type, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(tickets))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{type}",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path)),
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Petición registrada", body = Ticket),
        (status = 400, description = "Datos inválidos"),
        (status = 403, description = "Módulo desactivado o alta en nombre de otro no permitida")
    )
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(ticket_type): Path<TicketType>,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_module(&app_state, &locale, ticket_type, &user).await?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .create(ticket_type, &payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{type}/stats",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path)),
    responses((status = 200, description = "Informe del curso escolar", body = TicketStats))
)]
pub async fn ticket_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(ticket_type): Path<TicketType>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_module(&app_state, &locale, ticket_type, &user).await?;

    let stats = app_state
        .ticket_service
        .stats(ticket_type, &user, Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{type}/{id}",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Petición", body = Ticket),
        (status = 404, description = "No existe o fuera de tu alcance")
    )
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((ticket_type, id)): Path<(TicketType, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_module(&app_state, &locale, ticket_type, &user).await?;

    let ticket = app_state
        .ticket_service
        .get(ticket_type, id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(ticket))
}

#[utoipa::path(
    put,
    path = "/api/tickets/{type}/{id}",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path), ("id" = Uuid, Path)),
    request_body = UpdateTicketPayload,
    responses(
        (status = 200, description = "Petición actualizada", body = Ticket),
        (status = 400, description = "Transición de estado no permitida"),
        (status = 403, description = "Solo el equipo responsable")
    )
)]
pub async fn update_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((ticket_type, id)): Path<(TicketType, Uuid)>,
    Json(payload): Json<UpdateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_module(&app_state, &locale, ticket_type, &user).await?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let ticket = app_state
        .ticket_service
        .update(ticket_type, id, &payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(ticket))
}

async fn decide(
    app_state: AppState,
    locale: Locale,
    user: Principal,
    ticket_type: TicketType,
    id: Uuid,
    approve: bool,
) -> Result<Json<Ticket>, ApiError> {
    ensure_module(&app_state, &locale, ticket_type, &user).await?;

    let ticket = app_state
        .ticket_service
        .decide(ticket_type, id, approve, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(ticket))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{type}/{id}/approve",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Petición validada", body = Ticket),
        (status = 400, description = "No está pendiente de validación"),
        (status = 403, description = "Solo dirección")
    )
)]
pub async fn approve_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((ticket_type, id)): Path<(TicketType, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    decide(app_state, locale, user, ticket_type, id, true).await
}

#[utoipa::path(
    post,
    path = "/api/tickets/{type}/{id}/reject",
    tag = "Tickets",
    security(("api_jwt" = [])),
    params(("type" = TicketType, Path), ("id" = Uuid, Path)),
    responses(
        (status = 200, description = "Petición rechazada", body = Ticket),
        (status = 400, description = "No está pendiente de validación"),
        (status = 403, description = "Solo dirección")
    )
)]
pub async fn reject_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((ticket_type, id)): Path<(TicketType, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    decide(app_state, locale, user, ticket_type, id, false).await
}
