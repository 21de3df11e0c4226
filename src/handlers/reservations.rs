// src/handlers/reservations.rs

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
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
        modules::{CartsModule, RequireModule, SumModule},
    },
    models::reservations::{
        Cart, CartPayload, CreateReservationPayload, Reservation, ReservationQuery, ResourceKind,
        TimeSlot, TIME_SLOTS,
    },
    services::{change_feed::ChangeTopic, reservation_service::ReservationService},
};

#[utoipa::path(
    get,
    path = "/api/time-slots",
    tag = "Reservations",
    responses((status = 200, description = "Franjas horarias de la jornada", body = Vec<TimeSlot>))
)]
pub async fn list_time_slots() -> impl IntoResponse {
    Json(TIME_SLOTS.to_vec())
}

fn day_event(reservations: &[Reservation]) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event("reservations")
        .json_data(reservations)
        .unwrap_or_else(|e| {
            tracing::error!("No se pudieron serializar las reservas: {}", e);
            Event::default().event("error")
        }))
}

/// Reservas de un día: la lista al conectar y tras cada cambio de ese recurso y día.
fn day_stream(
    app_state: &AppState,
    resource: ResourceKind,
    date: NaiveDate,
    cart_id: Option<Uuid>,
    initial: Vec<Reservation>,
) -> impl Stream<Item = Result<Event, Infallible>> + use<> {
    let topic = ChangeTopic::Reservations(resource, date);
    let receiver = app_state.change_feed.subscribe();
    let service: ReservationService = app_state.reservation_service.clone();

    stream::unfold(
        (Some(initial), receiver, service),
        move |(pending, mut receiver, service)| {
            let topic = topic.clone();
            async move {
                if let Some(day) = pending {
                    return Some((day_event(&day), (None, receiver, service)));
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

                let event = match service.list(resource, date, cart_id).await {
                    Ok(day) => day_event(&day),
                    Err(e) => {
                        tracing::error!("No se pudo recargar {}: {}", topic, e);
                        Ok(Event::default().event("error"))
                    }
                };
                Some((event, (None, receiver, service)))
            }
        },
    )
}

// ---
// SUM
// ---

#[utoipa::path(
    get,
    path = "/api/sum/reservations",
    tag = "Reservations",
    security(("api_jwt" = [])),
    params(ReservationQuery),
    responses((status = 200, description = "Reservas del día", body = Vec<Reservation>))
)]
pub async fn list_sum_reservations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireModule<SumModule>,
    Query(query): Query<ReservationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = app_state
        .reservation_service
        .list(ResourceKind::Sum, query.date, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(reservations))
}

#[utoipa::path(
    get,
    path = "/api/sum/reservations/stream",
    tag = "Reservations",
    security(("api_jwt" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Eventos 'reservations' con las reservas del día", content_type = "text/event-stream", body = Vec<Reservation>)
    )
)]
pub async fn stream_sum_reservations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireModule<SumModule>,
    Query(query): Query<ReservationQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = app_state
        .reservation_service
        .list(ResourceKind::Sum, query.date, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let events = day_stream(&app_state, ResourceKind::Sum, query.date, None, initial);
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    post,
    path = "/api/sum/reservations",
    tag = "Reservations",
    security(("api_jwt" = [])),
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Reserva creada", body = Reservation),
        (status = 400, description = "Día no reservable o franja inexistente"),
        (status = 409, description = "Franja ocupada")
    )
)]
pub async fn create_sum_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<SumModule>,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reservation = app_state
        .reservation_service
        .reserve(ResourceKind::Sum, &payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[utoipa::path(
    delete,
    path = "/api/sum/reservations/{id}",
    tag = "Reservations",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Reserva anulada"),
        (status = 403, description = "No es tuya"),
        (status = 404, description = "No existe")
    )
)]
pub async fn cancel_sum_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<SumModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .reservation_service
        .cancel(ResourceKind::Sum, id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Carros de portátiles
// ---

#[utoipa::path(
    get,
    path = "/api/carts",
    tag = "Carts",
    security(("api_jwt" = [])),
    responses((status = 200, description = "Carros (inactivos solo para gestores)", body = Vec<Cart>))
)]
pub async fn list_carts(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CartsModule>,
) -> Result<impl IntoResponse, ApiError> {
    let carts = app_state
        .reservation_service
        .list_carts(&user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(carts))
}

#[utoipa::path(
    post,
    path = "/api/carts",
    tag = "Carts",
    security(("api_jwt" = [])),
    request_body = CartPayload,
    responses(
        (status = 201, description = "Carro creado", body = Cart),
        (status = 403, description = "Solo equipo TIC")
    )
)]
pub async fn create_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CartsModule>,
    Json(payload): Json<CartPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let cart = app_state
        .reservation_service
        .create_cart(&payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(cart)))
}

#[utoipa::path(
    put,
    path = "/api/carts/{id}",
    tag = "Carts",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    request_body = CartPayload,
    responses(
        (status = 200, description = "Carro actualizado", body = Cart),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CartsModule>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CartPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let cart = app_state
        .reservation_service
        .update_cart(id, &payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(cart))
}

#[utoipa::path(
    delete,
    path = "/api/carts/{id}",
    tag = "Carts",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Carro y sus reservas eliminados"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CartsModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .reservation_service
        .delete_cart(id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/carts/reservations",
    tag = "Carts",
    security(("api_jwt" = [])),
    params(ReservationQuery),
    responses((status = 200, description = "Reservas de carros del día", body = Vec<Reservation>))
)]
pub async fn list_cart_reservations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireModule<CartsModule>,
    Query(query): Query<ReservationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = app_state
        .reservation_service
        .list(ResourceKind::Cart, query.date, query.cart_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(Json(reservations))
}

#[utoipa::path(
    get,
    path = "/api/carts/reservations/stream",
    tag = "Carts",
    security(("api_jwt" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Eventos 'reservations' con las reservas de carros del día", content_type = "text/event-stream", body = Vec<Reservation>)
    )
)]
pub async fn stream_cart_reservations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireModule<CartsModule>,
    Query(query): Query<ReservationQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let initial = app_state
        .reservation_service
        .list(ResourceKind::Cart, query.date, query.cart_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let events = day_stream(&app_state, ResourceKind::Cart, query.date, query.cart_id, initial);
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    post,
    path = "/api/carts/reservations",
    tag = "Carts",
    security(("api_jwt" = [])),
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Reserva creada", body = Reservation),
        (status = 400, description = "Día no reservable, carro inactivo o sin carro"),
        (status = 409, description = "Carro ocupado en esa franja")
    )
)]
pub async fn create_cart_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CartsModule>,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reservation = app_state
        .reservation_service
        .reserve(ResourceKind::Cart, &payload, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[utoipa::path(
    delete,
    path = "/api/carts/reservations/{id}",
    tag = "Carts",
    security(("api_jwt" = [])),
    params(("id" = Uuid, Path)),
    responses(
        (status = 204, description = "Reserva anulada"),
        (status = 403, description = "No es tuya"),
        (status = 404, description = "No existe")
    )
)]
pub async fn cancel_cart_reservation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireModule<CartsModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .reservation_service
        .cancel(ResourceKind::Cart, id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    Ok(StatusCode::NO_CONTENT)
}
