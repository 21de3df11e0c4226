// src/services/user_service.rs

use crate::{
    common::error::AppError,
    db::{AuditRepository, DepartmentRepository, UserRepository},
    models::auth::{roles_to_db, LoginAuditEntry, Principal, UpdateUserPayload},
};

pub const DEFAULT_AUDIT_LIMIT: i64 = 100;

// Administración de perfiles y consulta de la auditoría de accesos
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    department_repo: DepartmentRepository,
    audit_repo: AuditRepository,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        department_repo: DepartmentRepository,
        audit_repo: AuditRepository,
    ) -> Self {
        Self { user_repo, department_repo, audit_repo }
    }

    pub async fn list_users(&self) -> Result<Vec<Principal>, AppError> {
        self.user_repo.list_all().await
    }

    /// Sustituye el conjunto de roles y fija departamento y administración.
    pub async fn update_user(
        &self,
        uid: &str,
        payload: &UpdateUserPayload,
        admin: &Principal,
    ) -> Result<Principal, AppError> {
        if let Some(department_id) = payload.department_id {
            self.department_repo
                .find(department_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("departamento {}", department_id)))?;
        }

        let updated = self
            .user_repo
            .update_profile(uid, &roles_to_db(&payload.roles), payload.department_id, payload.is_admin)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("usuario {}", uid)))?;

        tracing::info!(
            "👤 Perfil de {} actualizado por {}: roles={:?} admin={}",
            updated.email,
            admin.email,
            payload.roles,
            payload.is_admin
        );
        Ok(updated)
    }

    pub async fn login_audit(&self, limit: Option<i64>) -> Result<Vec<LoginAuditEntry>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, 1000);
        self.audit_repo.list_recent(limit).await
    }
}
