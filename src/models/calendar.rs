// src/models/calendar.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Huecos por día cuando no hay registro.
pub const MAX_SLOTS: i16 = 4;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "event_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Meeting,
    Evaluation,
    Cloister,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStep {
    Increment,
    Decrement,
}

// --- Registros ---

// Fila de 'day_slots'. Los fines de semana nunca se guardan aquí.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DaySlotRecord {
    #[schema(value_type = String, example = "2025-10-14")]
    pub day: NaiveDate,
    #[schema(example = "2025-10")]
    pub month_id: String,
    #[schema(example = 3)]
    pub remaining_slots: i16,
    pub is_holiday: bool,
}

impl DaySlotRecord {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day,
            month_id: month_id(day),
            remaining_slots: MAX_SLOTS,
            is_holiday: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    #[schema(value_type = String, example = "2025-10-14")]
    pub day: NaiveDate,
    #[schema(example = "Claustro ordinario")]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[schema(example = "17:00")]
    pub event_time: Option<String>,
    #[schema(example = "https://meet.google.com/abc-defg-hij")]
    pub link: Option<String>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Estado calculado de un día para la rejilla del calendario.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    #[schema(value_type = String, example = "2025-10-14")]
    pub date: NaiveDate,
    pub weekend: bool,
    pub holiday: bool,
    // Ausente en fines de semana y festivos
    pub remaining_slots: Option<i16>,
    pub bookable: bool,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    #[schema(example = "2025-10")]
    pub month_id: String,
    pub days: Vec<DayView>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustCapacityPayload {
    pub step: CapacityStep,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Sesión de evaluación 1º ESO")]
    pub title: String,

    #[serde(rename = "type", default = "default_event_type")]
    pub kind: EventType,

    #[validate(length(min = 4, max = 5, message = "invalid_time"))]
    #[schema(example = "16:30")]
    pub time: Option<String>,

    #[validate(url(message = "invalid_url"))]
    pub link: Option<String>,

    pub description: Option<String>,
}

fn default_event_type() -> EventType {
    EventType::Other
}

/// "YYYY-MM", clave de agrupación mensual.
pub fn month_id(day: NaiveDate) -> String {
    day.format("%Y-%m").to_string()
}
