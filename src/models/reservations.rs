// src/models/reservations.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "resource_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Sum,
    Cart,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Sum => "sum",
            ResourceKind::Cart => "cart",
        }
    }
}

/// Franja horaria fija de la jornada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub index: i16,
    pub label: &'static str,
    pub is_break: bool,
}

pub const TIME_SLOTS: [TimeSlot; 7] = [
    TimeSlot { index: 0, label: "08:00 - 09:00", is_break: false },
    TimeSlot { index: 1, label: "09:00 - 10:00", is_break: false },
    TimeSlot { index: 2, label: "10:00 - 11:00", is_break: false },
    TimeSlot { index: 3, label: "11:00 - 11:30 (Recreo)", is_break: true },
    TimeSlot { index: 4, label: "11:30 - 12:30", is_break: false },
    TimeSlot { index: 5, label: "12:30 - 13:30", is_break: false },
    TimeSlot { index: 6, label: "13:30 - 14:30", is_break: false },
];

pub fn time_slot(index: i16) -> Option<&'static TimeSlot> {
    TIME_SLOTS.iter().find(|slot| slot.index == index)
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub resource: ResourceKind,
    #[schema(value_type = String, example = "2025-10-14")]
    pub reservation_date: NaiveDate,
    #[schema(example = 2)]
    pub slot_index: i16,
    #[schema(example = "10:00 - 11:00")]
    pub slot_label: String,
    pub cart_id: Option<Uuid>,
    #[schema(example = "3º ESO B - Proyecto de Tecnología")]
    pub title: String,
    pub user_id: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    #[schema(example = "Carro 1")]
    pub name: String,
    #[schema(example = "Sala de profesores")]
    pub location: String,
    #[schema(example = "25 portátiles")]
    pub description: Option<String>,
    pub active: bool,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationPayload {
    #[schema(value_type = String, example = "2025-10-14")]
    pub date: NaiveDate,

    #[validate(range(min = 0, max = 6, message = "invalid_slot"))]
    pub slot_index: i16,

    pub cart_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReservationQuery {
    #[param(value_type = String, example = "2025-10-14")]
    pub date: NaiveDate,
    // Solo carros: filtra por carro
    pub cart_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,

    #[validate(length(min = 1, message = "required"))]
    pub location: String,

    pub description: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_table_is_indexed_in_order() {
        for (position, slot) in TIME_SLOTS.iter().enumerate() {
            assert_eq!(slot.index as usize, position);
        }
        assert!(time_slot(3).unwrap().is_break);
        assert!(time_slot(7).is_none());
        assert!(time_slot(-1).is_none());
    }
}
