// src/models/auth.rs

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Roles ---

/// Vocabulario cerrado de roles. El nombre serializado es el que se guarda en `users.roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum RoleTag {
    #[serde(rename = "director")]
    Director,
    #[serde(rename = "equipo_directivo")]
    EquipoDirectivo,
    #[serde(rename = "equipo_tic")]
    EquipoTic,
    #[serde(rename = "equipo_mantenimiento")]
    EquipoMantenimiento,
    #[serde(rename = "equipo_3d")]
    Equipo3d,
    #[serde(rename = "jefe_departamento")]
    JefeDepartamento,
    #[serde(rename = "tester")]
    Tester,
}

impl RoleTag {
    pub const ALL: [RoleTag; 7] = [
        RoleTag::Director,
        RoleTag::EquipoDirectivo,
        RoleTag::EquipoTic,
        RoleTag::EquipoMantenimiento,
        RoleTag::Equipo3d,
        RoleTag::JefeDepartamento,
        RoleTag::Tester,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::Director => "director",
            RoleTag::EquipoDirectivo => "equipo_directivo",
            RoleTag::EquipoTic => "equipo_tic",
            RoleTag::EquipoMantenimiento => "equipo_mantenimiento",
            RoleTag::Equipo3d => "equipo_3d",
            RoleTag::JefeDepartamento => "jefe_departamento",
            RoleTag::Tester => "tester",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleTag::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("rol desconocido: {}", s))
    }
}

/// Convierte la columna `TEXT[]` en un conjunto de roles. Las etiquetas desconocidas se descartan.
pub fn parse_roles(raw: &[String]) -> BTreeSet<RoleTag> {
    raw.iter()
        .filter_map(|tag| match tag.parse::<RoleTag>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!("Ignorando etiqueta de rol: {}", e);
                None
            }
        })
        .collect()
}

pub fn roles_to_db(roles: &BTreeSet<RoleTag>) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

// --- Usuarios ---

// Fila tal cual sale de la tabla 'users'
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub roles: Vec<String>,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usuario autenticado con su perfil de roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[schema(example = "k9Jx2mQp7rT")]
    pub uid: String,
    #[schema(example = "mgarcia@iesamachado.org")]
    pub email: String,
    #[schema(example = "María García")]
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub roles: BTreeSet<RoleTag>,
    pub department_id: Option<Uuid>,
}

impl Principal {
    pub fn has_role(&self, role: RoleTag) -> bool {
        self.roles.contains(&role)
    }

    /// Nombre para mostrar; si no hay, la parte local del correo.
    pub fn name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.email.split('@').next().unwrap_or(&self.email).to_string(),
        }
    }
}

impl From<UserRow> for Principal {
    fn from(row: UserRow) -> Self {
        Self {
            roles: parse_roles(&row.roles),
            uid: row.uid,
            email: row.email,
            display_name: row.display_name,
            is_admin: row.is_admin,
            department_id: row.department_id,
        }
    }
}

// --- Admisión ---

/// Motivo por el que un correo no es admitido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDenial {
    DomainMismatch,
    NumericPrefix,
    Unrecognized,
}

impl AdmissionDenial {
    pub fn message_key(&self) -> &'static str {
        match self {
            AdmissionDenial::DomainMismatch => "auth.denied.domain",
            AdmissionDenial::NumericPrefix => "auth.denied.numeric_prefix",
            AdmissionDenial::Unrecognized => "auth.denied.unrecognized",
        }
    }

    /// Texto que se guarda en el registro de auditoría.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionDenial::DomainMismatch => "El dominio del correo no es el institucional",
            AdmissionDenial::NumericPrefix => "Cuenta de alumnado (número antes de la @)",
            AdmissionDenial::Unrecognized => "Correo no reconocido",
        }
    }
}

impl fmt::Display for AdmissionDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

// --- Auditoría de accesos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "login_outcome", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoginOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginAuditEntry {
    pub id: Uuid,
    pub kind: LoginOutcome,
    pub email: String,
    pub name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Sesión ---

// Datos para login: el ID token emitido por el proveedor de identidad
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "required"))]
    pub id_token: String,
}

// Respuesta del inicio de sesión
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub principal: Principal,
}

// Estructura de datos ("claims") dentro del JWT de sesión
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // uid del usuario
    pub exp: usize,   // Expiration time
    pub iat: usize,   // Issued At
}

// Administración de usuarios
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    pub roles: BTreeSet<RoleTag>,
    pub department_id: Option<Uuid>,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tags_round_trip_through_their_wire_names() {
        for role in RoleTag::ALL {
            assert_eq!(role.as_str().parse::<RoleTag>(), Ok(role));
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn unknown_roles_are_dropped() {
        let roles = parse_roles(&["tester".into(), "superuser".into(), "equipo_3d".into()]);
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&RoleTag::Tester));
        assert!(roles.contains(&RoleTag::Equipo3d));
    }

    #[test]
    fn name_falls_back_to_local_part() {
        let principal = Principal {
            uid: "u1".into(),
            email: "jperez@iesamachado.org".into(),
            display_name: None,
            is_admin: false,
            roles: BTreeSet::new(),
            department_id: None,
        };
        assert_eq!(principal.name(), "jperez");
    }
}
