// src/db/module_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::modules::{ModuleConfig, ModuleKey, VisibilityState},
};

#[derive(Clone)]
pub struct ModuleRepository {
    pool: PgPool,
}

impl ModuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<ModuleConfig, AppError> {
        let rows: Vec<(String, VisibilityState)> =
            sqlx::query_as("SELECT module_key, state FROM module_config")
                .fetch_all(&self.pool)
                .await?;

        let mut config = ModuleConfig::default();
        for (raw_key, state) in rows {
            match raw_key.parse::<ModuleKey>() {
                Ok(key) => config.set(key, state),
                Err(e) => tracing::warn!("Ignorando configuración: {}", e),
            }
        }
        Ok(config)
    }

    pub async fn upsert(
        &self,
        key: ModuleKey,
        state: VisibilityState,
        updated_by: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO module_config (module_key, state, updated_by, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (module_key)
            DO UPDATE SET state = EXCLUDED.state,
                          updated_by = EXCLUDED.updated_by,
                          updated_at = NOW()
            "#,
        )
        .bind(key.as_str())
        .bind(state)
        .bind(updated_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
