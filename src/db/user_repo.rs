// src/db/user_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Principal, UserRow},
};

const USER_COLUMNS: &str =
    "uid, email, display_name, is_admin, roles, department_id, created_at, updated_at";

// Acceso a la tabla 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_uid(&self, uid: &str) -> Result<Option<Principal>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE uid = $1",
            USER_COLUMNS
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Principal::from))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Principal::from))
    }

    /// Crea el perfil en el primer acceso. Nunca sobrescribe uno existente.
    pub async fn ensure_user(
        &self,
        uid: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (uid, email, display_name, is_admin, roles, department_id)
            VALUES ($1, $2, $3, FALSE, '{}', NULL)
            ON CONFLICT (uid) DO NOTHING
            "#,
        )
        .bind(uid)
        .bind(email)
        .bind(display_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list_all(&self) -> Result<Vec<Principal>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY email ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Principal::from).collect())
    }

    pub async fn list_by_department(&self, department_id: Uuid) -> Result<Vec<Principal>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE department_id = $1 ORDER BY email ASC",
            USER_COLUMNS
        ))
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Principal::from).collect())
    }

    /// Sustituye roles, departamento y bandera de administrador.
    pub async fn update_profile(
        &self,
        uid: &str,
        roles: &[String],
        department_id: Option<Uuid>,
        is_admin: bool,
    ) -> Result<Option<Principal>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET roles = $2, department_id = $3, is_admin = $4, updated_at = NOW()
            WHERE uid = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(uid)
        .bind(roles)
        .bind(department_id)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Principal::from))
    }

    pub async fn set_department(
        &self,
        uid: &str,
        department_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET department_id = $2, updated_at = NOW() WHERE uid = $1",
        )
        .bind(uid)
        .bind(department_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
