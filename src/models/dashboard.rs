// src/models/dashboard.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{modules::ModuleKey, tickets::Ticket};

// Tarjeta de un módulo visible en el panel
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCard {
    pub key: ModuleKey,
    // Tickets abiertos / en curso, o número de anuncios
    pub badge: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub modules: Vec<ModuleCard>,
    pub my_open_tickets: Vec<Ticket>,
}
