// src/handlers/calendar.rs

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::NaiveDate;
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        modules::{CalendarModule, RequireModule},
    },
    models::calendar::{AdjustCapacityPayload, CalendarEvent, CreateEventPayload, DayView, MonthView},
    services::change_feed::ChangeTopic,
};

#[utoipa::path(
    get,
    path = "/api/calendar/{year}/{month}",
    tag = "Calendar",
    security(("api_jwt" = [])),
    params(
        ("year" = i32, Path, example = 2025),
        ("month" = u32, Path, example = 10)
    ),
    responses(
        (status = 200, description = "Vista del mes", body = MonthView),
        (status = 400, description = "Mes inválido")
    )
)]
pub async fn get_month(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireModule<CalendarModule>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .calendar_service
        .month_view(year, month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(view))
}

fn month_event(view: &MonthView) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event("month")
        .json_data(view)
        .unwrap_or_else(|e| {
            tracing::error!("No se pudo serializar el mes {}: {}", view.month_id, e);
            Event::default().event("error")
        }))
}

/// Suscripción al mes: la vista completa al conectar y tras cada cambio.
#[utoipa::path(
    get,
    path = "/api/calendar/{year}/{month}/stream",
    tag = "Calendar",
    security(("api_jwt" = [])),
    params(
        ("year" = i32, Path, example = 2025),
        ("month" = u32, Path, example = 10)
    ),
    responses(
        (status = 200, description = "Eventos 'month' con la vista del mes", content_type = "text/event-stream", body = MonthView)
    )
)]
pub async fn stream_month(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireModule<CalendarModule>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = app_state
        .calendar_service
        .month_view(year, month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let topic = ChangeTopic::Calendar(initial.month_id.clone());
    let receiver = app_state.change_feed.subscribe();
    let service = app_state.calendar_service.clone();

    // La suscripción vive lo que la conexión
    let events = stream::unfold(
        (Some(initial), receiver, service),
        move |(pending, mut receiver, service)| {
            let topic = topic.clone();
            async move {
                if let Some(view) = pending {
                    return Some((month_event(&view), (None, receiver, service)));
                }

                loop {
                    match receiver.recv().await {
                        Ok(changed) if changed == topic => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Suscriptor de {} atrasado ({} cambios)", topic, skipped);
                            break;
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }

                let event = match service.month_view(year, month).await {
                    Ok(view) => month_event(&view),
                    Err(e) => {
                        tracing::error!("No se pudo recargar {}: {}", topic, e);
                        Ok(Event::default().event("error"))
                    }
                };
                Some((event, (None, receiver, service)))
            }
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    post,
    path = "/api/calendar/days/{date}/capacity",
    tag = "Calendar",
    security(("api_jwt" = [])),
    params(("date" = String, Path, example = "2025-10-14")),
    request_body = AdjustCapacityPayload,
    responses(
        (status = 200, description = "Día actualizado", body = DayView),
        (status = 400, description = "Fin de semana o festivo"),
        (status = 403, description = "Solo dirección")
    )
)]
pub async fn adjust_capacity(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CalendarModule>,
    Path(date): Path<NaiveDate>,
    Json(payload): Json<AdjustCapacityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let day = app_state
        .calendar_service
        .adjust_capacity(date, payload.step, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(day))
}

#[utoipa::path(
    post,
    path = "/api/calendar/days/{date}/holiday",
    tag = "Calendar",
    security(("api_jwt" = [])),
    params(("date" = String, Path, example = "2025-12-08")),
    responses(
        (status = 200, description = "Marca de festivo invertida", body = DayView),
        (status = 400, description = "Fin de semana"),
        (status = 403, description = "Solo dirección")
    )
)]
pub async fn toggle_holiday(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CalendarModule>,
    Path(date): Path<NaiveDate>,
) -> Result<impl IntoResponse, ApiError> {
    let day = app_state
        .calendar_service
        .toggle_holiday(date, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(day))
}

#[utoipa::path(
    post,
    path = "/api/calendar/days/{date}/events",
    tag = "Calendar",
    security(("api_jwt" = [])),
    params(("date" = String, Path, example = "2025-10-14")),
    request_body = CreateEventPayload,
    responses(
        (status = 201, description = "Evento creado", body = CalendarEvent),
        (status = 403, description = "Solo equipo directivo")
    )
)]
pub async fn add_event(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CalendarModule>,
    Path(date): Path<NaiveDate>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let event = app_state
        .calendar_service
        .add_event(date, &payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    delete,
    path = "/api/calendar/events/{id}",
    tag = "Calendar",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Evento eliminado"),
        (status = 404, description = "No existe")
    )
)]
pub async fn remove_event(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CalendarModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .calendar_service
        .remove_event(id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}
