// src/services/announcement_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AnnouncementRepository,
    models::{
        announcements::{Announcement, CreateAnnouncementPayload},
        auth::Principal,
    },
    services::visibility::Permissions,
};

/// Sin destinatarios es para todo el claustro.
pub fn is_addressed_to(announcement: &Announcement, principal: &Principal) -> bool {
    principal.is_admin
        || announcement.author_id == principal.uid
        || announcement.target_roles.is_empty()
        || announcement.target_roles.iter().any(|role| principal.has_role(*role))
}

#[derive(Clone)]
pub struct AnnouncementService {
    announcement_repo: AnnouncementRepository,
}

impl AnnouncementService {
    pub fn new(announcement_repo: AnnouncementRepository) -> Self {
        Self { announcement_repo }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Announcement>, AppError> {
        let all = self.announcement_repo.list().await?;
        Ok(all.into_iter().filter(|a| is_addressed_to(a, principal)).collect())
    }

    pub async fn create(
        &self,
        payload: &CreateAnnouncementPayload,
        author: &Principal,
    ) -> Result<Announcement, AppError> {
        if !Permissions::for_principal(author).can_publish_announcements {
            return Err(AppError::Forbidden);
        }
        let announcement = self
            .announcement_repo
            .insert(payload, &author.uid, &author.name())
            .await?;
        tracing::info!("📢 Anuncio '{}' publicado por {}", announcement.title, author.email);
        Ok(announcement)
    }

    pub async fn delete(&self, id: Uuid, principal: &Principal) -> Result<(), AppError> {
        let announcement = self
            .announcement_repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("anuncio {}", id)))?;

        let is_author = announcement.author_id == principal.uid
            && Permissions::for_principal(principal).can_publish_announcements;
        if !(is_author || principal.is_admin) {
            return Err(AppError::Forbidden);
        }

        self.announcement_repo.delete(id).await?;
        tracing::info!("📢 Anuncio {} eliminado por {}", id, principal.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::RoleTag, tickets::Priority};
    use std::collections::BTreeSet;

    fn principal(uid: &str, roles: &[RoleTag], is_admin: bool) -> Principal {
        Principal {
            uid: uid.into(),
            email: format!("{}@iesamachado.org", uid),
            display_name: None,
            is_admin,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            department_id: None,
        }
    }

    fn announcement(targets: &[RoleTag]) -> Announcement {
        Announcement {
            id: Uuid::new_v4(),
            title: "Reunión de jefaturas".into(),
            content: "Martes a las 17:00".into(),
            priority: Priority::Alta,
            target_roles: targets.iter().copied().collect(),
            author_id: "direccion".into(),
            author_name: "Dirección".into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn untargeted_announcements_reach_everyone() {
        assert!(is_addressed_to(&announcement(&[]), &principal("ana", &[], false)));
    }

    #[test]
    fn targeted_announcements_reach_their_roles() {
        let a = announcement(&[RoleTag::JefeDepartamento]);
        assert!(is_addressed_to(&a, &principal("jefe", &[RoleTag::JefeDepartamento], false)));
        assert!(!is_addressed_to(&a, &principal("ana", &[RoleTag::Tester], false)));
    }

    #[test]
    fn authors_and_admins_always_see_them() {
        let a = announcement(&[RoleTag::Equipo3d]);
        assert!(is_addressed_to(&a, &principal("direccion", &[], false)));
        assert!(is_addressed_to(&a, &principal("root", &[], true)));
    }
}
