// src/services/dashboard_service.rs

use crate::{
    common::error::AppError,
    models::{
        auth::Principal,
        dashboard::{DashboardSummary, ModuleCard},
        modules::ModuleKey,
        tickets::TicketType,
    },
    services::{
        announcement_service::AnnouncementService, ticket_service::TicketService,
        visibility::{visible, VisibilityService},
    },
};

pub const MY_OPEN_TICKETS_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct DashboardService {
    visibility_service: VisibilityService,
    ticket_service: TicketService,
    announcement_service: AnnouncementService,
}

impl DashboardService {
    pub fn new(
        visibility_service: VisibilityService,
        ticket_service: TicketService,
        announcement_service: AnnouncementService,
    ) -> Self {
        Self { visibility_service, ticket_service, announcement_service }
    }

    pub async fn summary(&self, principal: &Principal) -> Result<DashboardSummary, AppError> {
        let config = self.visibility_service.config().await?;

        let mut modules = Vec::new();
        for key in ModuleKey::ALL {
            if !visible(key, &config, principal) {
                continue;
            }
            let badge = match key {
                ModuleKey::TicketsTic => Some(self.active_count(TicketType::Tic, principal).await?),
                ModuleKey::TicketsMaintenance => {
                    Some(self.active_count(TicketType::Maintenance, principal).await?)
                }
                ModuleKey::Anuncios => Some(self.announcement_service.list(principal).await?.len()),
                _ => None,
            };
            modules.push(ModuleCard { key, badge });
        }

        let my_open_tickets = self
            .ticket_service
            .my_open_tickets(principal, MY_OPEN_TICKETS_LIMIT)
            .await?;

        Ok(DashboardSummary { modules, my_open_tickets })
    }

    async fn active_count(&self, ticket_type: TicketType, principal: &Principal) -> Result<usize, AppError> {
        let count = self.ticket_service.count_active(ticket_type, principal).await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
