// src/models/departments.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Principal;

// Nunca se borra: tickets y usuarios apuntan a él por id
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    #[schema(example = "Matemáticas")]
    pub name: String,
    #[schema(example = "MAT")]
    pub code: Option<String>,
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPayload {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,

    pub code: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentWithMembers {
    #[serde(flatten)]
    pub department: Department,
    pub members: Vec<Principal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
}
