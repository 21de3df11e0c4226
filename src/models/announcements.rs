// src/models/announcements.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    auth::{RoleTag, parse_roles},
    tickets::Priority,
};

#[derive(Debug, Clone, FromRow)]
pub struct AnnouncementRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub target_roles: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    #[schema(example = "Claustro extraordinario el jueves")]
    pub title: String,
    pub content: String,
    pub priority: Priority,
    // Vacío = visible para todo el claustro
    pub target_roles: BTreeSet<RoleTag>,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            target_roles: parse_roles(&row.target_roles),
            id: row.id,
            title: row.title,
            content: row.content,
            priority: row.priority,
            author_id: row.author_id,
            author_name: row.author_name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: String,

    #[validate(length(min = 1, message = "required"))]
    pub content: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub target_roles: BTreeSet<RoleTag>,
}
