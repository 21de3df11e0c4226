// src/db/department_repo.rs

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::departments::{Department, DepartmentPayload},
};

#[derive(Clone)]
pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Department>, AppError> {
        let departments = sqlx::query_as::<_, Department>(
            r#"
            SELECT id, name, code, active
            FROM departments
            WHERE active OR $1
            ORDER BY name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(departments)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            "SELECT id, name, code, active FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(department)
    }

    /// Nombre de cada departamento, activo o no, para los informes.
    pub async fn names(&self) -> Result<HashMap<Uuid, String>, AppError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, name FROM departments")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn insert(&self, payload: &DepartmentPayload) -> Result<Department, AppError> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            INSERT INTO departments (name, code, active)
            VALUES ($1, $2, $3)
            RETURNING id, name, code, active
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.code.as_deref())
        .bind(payload.active)
        .fetch_one(&self.pool)
        .await?;
        Ok(department)
    }

    pub async fn update(&self, id: Uuid, payload: &DepartmentPayload) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            UPDATE departments
            SET name = $2, code = $3, active = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, code, active
            "#,
        )
        .bind(id)
        .bind(payload.name.trim())
        .bind(payload.code.as_deref())
        .bind(payload.active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(department)
    }

    // Baja lógica: usuarios y peticiones siguen apuntando a él
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE departments SET active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
