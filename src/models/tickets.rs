// src/models/tickets.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    auth::{Principal, RoleTag},
    modules::ModuleKey,
};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_type", rename_all = "snake_case")]
pub enum TicketType {
    #[serde(rename = "tic")]
    Tic,
    #[serde(rename = "maintenance")]
    Maintenance,
    #[serde(rename = "threeD", alias = "3d")]
    ThreeD,
}

impl TicketType {
    pub fn prefix(&self) -> &'static str {
        match self {
            TicketType::Tic => "TIC",
            TicketType::Maintenance => "MNT",
            TicketType::ThreeD => "3D",
        }
    }

    /// Rol del equipo que gestiona este tipo de petición.
    pub fn team_role(&self) -> RoleTag {
        match self {
            TicketType::Tic => RoleTag::EquipoTic,
            TicketType::Maintenance => RoleTag::EquipoMantenimiento,
            TicketType::ThreeD => RoleTag::Equipo3d,
        }
    }

    pub fn module(&self) -> ModuleKey {
        match self {
            TicketType::Tic => ModuleKey::TicketsTic,
            TicketType::Maintenance => ModuleKey::TicketsMaintenance,
            TicketType::ThreeD => ModuleKey::Tickets3d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Baja,
    #[default]
    Normal,
    Alta,
    Urgente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_status")]
pub enum TicketStatus {
    #[serde(rename = "pendiente_validacion")]
    #[sqlx(rename = "pendiente_validacion")]
    PendingValidation,
    #[serde(rename = "abierto")]
    #[sqlx(rename = "abierto")]
    Open,
    #[serde(rename = "en_progreso")]
    #[sqlx(rename = "en_progreso")]
    InProgress,
    #[serde(rename = "resuelto")]
    #[sqlx(rename = "resuelto")]
    Resolved,
    #[serde(rename = "cerrado")]
    #[sqlx(rename = "cerrado")]
    Closed,
    #[serde(rename = "rechazado")]
    #[sqlx(rename = "rechazado")]
    Rejected,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::PendingValidation => "pendiente_validacion",
            TicketStatus::Open => "abierto",
            TicketStatus::InProgress => "en_progreso",
            TicketStatus::Resolved => "resuelto",
            TicketStatus::Closed => "cerrado",
            TicketStatus::Rejected => "rechazado",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

// --- Ticket ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    #[schema(example = "TIC-001")]
    pub ticket_number: String,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    #[schema(example = "El proyector del aula 12 no enciende")]
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub requested_by: String,
    pub requested_by_name: String,
    pub requested_by_department: Option<Uuid>,
    pub assigned_to: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<f64>, example = 3.0)]
    pub resolution_time_hours: Option<Decimal>,
    #[schema(value_type = Option<f64>, example = 60.0)]
    pub labor_cost: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub equipment_cost: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_cost: Option<Decimal>,
    // Mantenimiento
    pub location: Option<String>,
    // Impresión 3D
    pub stl_url: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub filament_used: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub print_time: Option<Decimal>,
    pub image_url: Option<String>,
    pub printed_by: Option<String>,
    pub printed_by_name: Option<String>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: String,

    #[validate(length(min = 1, message = "required"))]
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    // Mantenimiento: ubicación de la incidencia
    pub location: Option<String>,

    // Impresión 3D: enlace al modelo
    #[validate(url(message = "invalid_url"))]
    pub stl_url: Option<String>,

    // El equipo de mantenimiento puede registrar la petición en nombre de otra persona
    pub on_behalf_of: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketPayload {
    pub status: Option<TicketStatus>,
    pub assigned_to: Option<String>,
    pub comments: Option<String>,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub equipment_cost: Option<Decimal>,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub total_cost: Option<Decimal>,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub filament_used: Option<Decimal>,

    #[validate(custom(function = "non_negative"))]
    #[schema(value_type = Option<f64>)]
    pub print_time: Option<Decimal>,

    #[validate(url(message = "invalid_url"))]
    pub image_url: Option<String>,
}

fn non_negative(value: &Decimal) -> Result<(), validator::ValidationError> {
    if value.is_sign_negative() {
        let mut err = validator::ValidationError::new("negative");
        err.message = Some("negative".into());
        return Err(err);
    }
    Ok(())
}

// --- Informes ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    #[schema(example = "2025-2026")]
    pub school_year: String,
    pub total: usize,
    pub open: usize,
    pub resolved: usize,
    pub by_status: BTreeMap<String, usize>,
    #[schema(value_type = Option<f64>)]
    pub avg_resolution_hours: Option<Decimal>,
    #[schema(value_type = f64)]
    pub total_cost: Decimal,
    pub by_department: BTreeMap<String, usize>,
}

// --- Alcance de consulta ---

/// Qué peticiones de un tipo puede ver un usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketScope {
    All,
    // Jefatura de departamento: las propias y las del departamento
    Department { department_id: Uuid, uid: String },
    Own(String),
}

impl TicketScope {
    pub fn for_principal(ticket_type: TicketType, principal: &Principal) -> Self {
        let sees_all = principal.is_admin
            || principal.has_role(ticket_type.team_role())
            || (ticket_type == TicketType::Maintenance
                && (principal.has_role(RoleTag::EquipoDirectivo)
                    || principal.has_role(RoleTag::Director)));

        if sees_all {
            return TicketScope::All;
        }

        match principal.department_id {
            Some(department_id) if principal.has_role(RoleTag::JefeDepartamento) => {
                TicketScope::Department { department_id, uid: principal.uid.clone() }
            }
            _ => TicketScope::Own(principal.uid.clone()),
        }
    }

    /// Parámetros del filtro SQL: (solicitante, departamento). Ambos nulos = sin filtro.
    pub fn filter_params(&self) -> (Option<&str>, Option<Uuid>) {
        match self {
            TicketScope::All => (None, None),
            TicketScope::Department { department_id, uid } => (Some(uid.as_str()), Some(*department_id)),
            TicketScope::Own(uid) => (Some(uid.as_str()), None),
        }
    }

}
