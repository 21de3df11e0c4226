// src/services/department_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DepartmentRepository, UserRepository},
    models::{
        auth::Principal,
        departments::{Department, DepartmentPayload, DepartmentWithMembers},
    },
    services::visibility::Permissions,
};

#[derive(Clone)]
pub struct DepartmentService {
    department_repo: DepartmentRepository,
    user_repo: UserRepository,
}

impl DepartmentService {
    pub fn new(department_repo: DepartmentRepository, user_repo: UserRepository) -> Self {
        Self { department_repo, user_repo }
    }

    // ---
    // Administración
    // ---

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Department>, AppError> {
        self.department_repo.list(include_inactive).await
    }

    pub async fn create(&self, payload: &DepartmentPayload) -> Result<Department, AppError> {
        let department = self.department_repo.insert(payload).await?;
        tracing::info!("🏫 Departamento '{}' creado", department.name);
        Ok(department)
    }

    pub async fn update(&self, id: Uuid, payload: &DepartmentPayload) -> Result<Department, AppError> {
        self.department_repo
            .update(id, payload)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("departamento {}", id)))
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        if !self.department_repo.deactivate(id).await? {
            return Err(AppError::NotFound(format!("departamento {}", id)));
        }
        tracing::info!("🏫 Departamento {} desactivado", id);
        Ok(())
    }

    // ---
    // Jefatura de departamento
    // ---

    pub async fn my_department(&self, head: &Principal) -> Result<DepartmentWithMembers, AppError> {
        let department_id = headed_department(head)?;
        let department = self
            .department_repo
            .find(department_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("departamento {}", department_id)))?;
        let members = self.user_repo.list_by_department(department_id).await?;
        Ok(DepartmentWithMembers { department, members })
    }

    pub async fn add_member(&self, head: &Principal, email: &str) -> Result<Principal, AppError> {
        let department_id = headed_department(head)?;

        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("usuario {}", email)))?;

        if user.department_id == Some(department_id) {
            return Err(AppError::ValidationFailed(format!(
                "{} ya pertenece al departamento",
                user.email
            )));
        }

        self.user_repo.set_department(&user.uid, Some(department_id)).await?;
        tracing::info!("🏫 {} añadido al departamento por {}", user.email, head.email);
        Ok(Principal { department_id: Some(department_id), ..user })
    }

    pub async fn remove_member(&self, head: &Principal, uid: &str) -> Result<(), AppError> {
        let department_id = headed_department(head)?;

        let user = self
            .user_repo
            .find_by_uid(uid)
            .await?
            .filter(|u| u.department_id == Some(department_id))
            .ok_or_else(|| AppError::NotFound(format!("miembro {}", uid)))?;

        self.user_repo.set_department(&user.uid, None).await?;
        tracing::info!("🏫 {} retirado del departamento por {}", user.email, head.email);
        Ok(())
    }
}

/// Departamento que dirige el usuario, si es jefe de alguno.
pub fn headed_department(principal: &Principal) -> Result<Uuid, AppError> {
    if !Permissions::for_principal(principal).is_department_head {
        return Err(AppError::Forbidden);
    }
    principal
        .department_id
        .ok_or_else(|| AppError::ValidationFailed("no tienes departamento asignado".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::RoleTag;
    use std::collections::BTreeSet;

    fn principal(roles: &[RoleTag], department_id: Option<Uuid>) -> Principal {
        Principal {
            uid: "jefe".into(),
            email: "jefe@iesamachado.org".into(),
            display_name: None,
            is_admin: false,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            department_id,
        }
    }

    #[test]
    fn heads_manage_their_own_department() {
        let dept = Uuid::new_v4();
        let head = principal(&[RoleTag::JefeDepartamento], Some(dept));
        assert_eq!(headed_department(&head).unwrap(), dept);
    }

    #[test]
    fn non_heads_are_forbidden() {
        let profesor = principal(&[], Some(Uuid::new_v4()));
        assert!(matches!(headed_department(&profesor), Err(AppError::Forbidden)));
    }

    #[test]
    fn heads_without_department_are_told_so() {
        let head = principal(&[RoleTag::JefeDepartamento], None);
        assert!(matches!(headed_department(&head), Err(AppError::ValidationFailed(_))));
    }
}
