// src/db/audit_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::auth::{LoginAuditEntry, LoginOutcome},
};

// Registro de accesos, solo se añade
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        kind: LoginOutcome,
        email: &str,
        name: Option<&str>,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO login_audit (kind, email, name, reason)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(kind)
        .bind(email)
        .bind(name)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<LoginAuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, LoginAuditEntry>(
            r#"
            SELECT id, kind, email, name, reason, created_at
            FROM login_audit
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
