// src/services/visibility.rs

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::ModuleRepository,
    models::{
        auth::{Principal, RoleTag},
        modules::{ModuleConfig, ModuleKey, ModuleVisibility, VisibilityState},
        tickets::TicketType,
    },
};

/// Política de visibilidad. Los administradores NO ven módulos inactivos aquí;
/// su acceso directo a rutas se concede en `ensure_access`.
pub fn visible(key: ModuleKey, config: &ModuleConfig, principal: &Principal) -> bool {
    match config.state(key) {
        VisibilityState::Active => true,
        VisibilityState::Inactive => false,
        VisibilityState::TestersOnly => principal.has_role(RoleTag::Tester),
    }
}

/// Permisos derivados del perfil, calculados una sola vez por petición.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_edit_slots: bool,
    pub can_add_events: bool,
    pub can_manage_tic: bool,
    pub can_manage_maintenance: bool,
    pub can_manage_3d: bool,
    pub can_approve_maintenance: bool,
    pub can_publish_announcements: bool,
    pub can_manage_carts: bool,
    pub can_manage_reservations: bool,
    pub is_department_head: bool,
}

impl Permissions {
    pub fn for_principal(principal: &Principal) -> Self {
        let manages = |ticket_type: TicketType| {
            principal.is_admin || principal.has_role(ticket_type.team_role())
        };

        Self {
            can_edit_slots: principal.has_role(RoleTag::Director),
            can_add_events: principal.has_role(RoleTag::EquipoDirectivo),
            can_manage_tic: manages(TicketType::Tic),
            can_manage_maintenance: manages(TicketType::Maintenance),
            can_manage_3d: manages(TicketType::ThreeD),
            can_approve_maintenance: principal.is_admin
                || principal.has_role(RoleTag::EquipoDirectivo),
            can_publish_announcements: principal.has_role(RoleTag::EquipoDirectivo)
                || principal.has_role(RoleTag::Director),
            can_manage_carts: principal.is_admin || principal.has_role(RoleTag::EquipoTic),
            can_manage_reservations: principal.is_admin || principal.has_role(RoleTag::EquipoTic),
            is_department_head: principal.has_role(RoleTag::JefeDepartamento),
        }
    }

    pub fn can_manage_tickets(&self, ticket_type: TicketType) -> bool {
        match ticket_type {
            TicketType::Tic => self.can_manage_tic,
            TicketType::Maintenance => self.can_manage_maintenance,
            TicketType::ThreeD => self.can_manage_3d,
        }
    }
}

#[derive(Clone)]
pub struct VisibilityService {
    module_repo: ModuleRepository,
}

impl VisibilityService {
    pub fn new(module_repo: ModuleRepository) -> Self {
        Self { module_repo }
    }

    pub async fn config(&self) -> Result<ModuleConfig, AppError> {
        self.module_repo.load().await
    }

    /// Entradas de navegación del usuario.
    pub async fn modules_for(&self, principal: &Principal) -> Result<Vec<ModuleVisibility>, AppError> {
        let config = self.config().await?;
        Ok(navigation(&config, principal))
    }

    /// Acceso a una ruta de módulo: visible o administrador.
    pub async fn ensure_access(&self, key: ModuleKey, principal: &Principal) -> Result<(), AppError> {
        let config = self.config().await?;
        if visible(key, &config, principal) || principal.is_admin {
            Ok(())
        } else {
            Err(AppError::ModuleDisabled(key))
        }
    }

    /// Escribe solo las claves recibidas; el resto se conserva.
    pub async fn update(
        &self,
        changes: BTreeMap<ModuleKey, VisibilityState>,
        updated_by: &str,
    ) -> Result<ModuleConfig, AppError> {
        for (key, state) in &changes {
            self.module_repo.upsert(*key, *state, updated_by).await?;
            tracing::info!("Módulo '{}' pasa a {:?} (por {})", key, state, updated_by);
        }
        self.config().await
    }
}

pub fn navigation(config: &ModuleConfig, principal: &Principal) -> Vec<ModuleVisibility> {
    ModuleKey::ALL
        .iter()
        .map(|&key| ModuleVisibility {
            key,
            state: config.state(key),
            visible: visible(key, config, principal),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn principal(roles: &[RoleTag], is_admin: bool) -> Principal {
        Principal {
            uid: "u1".into(),
            email: "profe@iesamachado.org".into(),
            display_name: None,
            is_admin,
            roles: roles.iter().copied().collect::<BTreeSet<_>>(),
            department_id: None,
        }
    }

    #[test]
    fn unset_module_is_visible() {
        let config = ModuleConfig::default();
        assert!(visible(ModuleKey::Carts, &config, &principal(&[], false)));
    }

    #[test]
    fn inactive_hides_from_everyone_including_admins() {
        let mut config = ModuleConfig::default();
        config.set(ModuleKey::Anuncios, VisibilityState::Inactive);
        assert!(!visible(ModuleKey::Anuncios, &config, &principal(&[], false)));
        assert!(!visible(ModuleKey::Anuncios, &config, &principal(&[RoleTag::Tester], true)));
    }

    #[test]
    fn testers_only_requires_tester_role() {
        let mut config = ModuleConfig::default();
        config.set(ModuleKey::Sum, VisibilityState::TestersOnly);
        assert!(visible(ModuleKey::Sum, &config, &principal(&[RoleTag::Tester], false)));
        assert!(!visible(ModuleKey::Sum, &config, &principal(&[RoleTag::EquipoTic], false)));
        assert!(!visible(ModuleKey::Sum, &config, &principal(&[], true)));
    }

    #[test]
    fn navigation_lists_every_module() {
        let mut config = ModuleConfig::default();
        config.set(ModuleKey::Sum, VisibilityState::TestersOnly);
        let nav = navigation(&config, &principal(&[], false));
        assert_eq!(nav.len(), ModuleKey::ALL.len());
        let sum = nav.iter().find(|m| m.key == ModuleKey::Sum).unwrap();
        assert_eq!(sum.state, VisibilityState::TestersOnly);
        assert!(!sum.visible);
    }

    #[test]
    fn permissions_follow_roles() {
        let director = Permissions::for_principal(&principal(&[RoleTag::Director], false));
        assert!(director.can_edit_slots);
        assert!(!director.can_add_events);
        assert!(director.can_publish_announcements);
        assert!(!director.can_approve_maintenance);

        let directivo = Permissions::for_principal(&principal(&[RoleTag::EquipoDirectivo], false));
        assert!(directivo.can_add_events);
        assert!(directivo.can_approve_maintenance);
        assert!(!directivo.can_edit_slots);

        let tic = Permissions::for_principal(&principal(&[RoleTag::EquipoTic], false));
        assert!(tic.can_manage_tickets(TicketType::Tic));
        assert!(!tic.can_manage_tickets(TicketType::ThreeD));
        assert!(tic.can_manage_carts);
        assert!(tic.can_manage_reservations);

        let admin = Permissions::for_principal(&principal(&[], true));
        assert!(admin.can_manage_tickets(TicketType::Maintenance));
        assert!(admin.can_approve_maintenance);
        assert!(!admin.can_edit_slots);
        assert!(!admin.is_department_head);

        let head = Permissions::for_principal(&principal(&[RoleTag::JefeDepartamento], false));
        assert!(head.is_department_head);
        assert!(!head.can_manage_tickets(TicketType::Tic));
    }
}
