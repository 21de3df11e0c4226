// src/db/announcement_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::announcements::{Announcement, AnnouncementRow, CreateAnnouncementPayload},
    models::auth::roles_to_db,
};

const ANNOUNCEMENT_COLUMNS: &str =
    "id, title, content, priority, target_roles, author_id, author_name, created_at";

#[derive(Clone)]
pub struct AnnouncementRepository {
    pool: PgPool,
}

impl AnnouncementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Todos, los más recientes primero. El filtrado por destinatario se hace en el servicio.
    pub async fn list(&self) -> Result<Vec<Announcement>, AppError> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {} FROM announcements ORDER BY created_at DESC",
            ANNOUNCEMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Announcement::from).collect())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Announcement>, AppError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {} FROM announcements WHERE id = $1",
            ANNOUNCEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Announcement::from))
    }

    pub async fn insert(
        &self,
        payload: &CreateAnnouncementPayload,
        author_id: &str,
        author_name: &str,
    ) -> Result<Announcement, AppError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            r#"
            INSERT INTO announcements (title, content, priority, target_roles, author_id, author_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ANNOUNCEMENT_COLUMNS
        ))
        .bind(payload.title.trim())
        .bind(payload.content.trim())
        .bind(payload.priority)
        .bind(roles_to_db(&payload.target_roles))
        .bind(author_id)
        .bind(author_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(Announcement::from(row))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
