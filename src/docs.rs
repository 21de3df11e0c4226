// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_modules,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,

        // --- Calendar ---
        handlers::calendar::get_month,
        handlers::calendar::stream_month,
        handlers::calendar::adjust_capacity,
        handlers::calendar::toggle_holiday,
        handlers::calendar::add_event,
        handlers::calendar::remove_event,

        // --- Reservations ---
        handlers::reservations::list_time_slots,
        handlers::reservations::list_sum_reservations,
        handlers::reservations::stream_sum_reservations,
        handlers::reservations::create_sum_reservation,
        handlers::reservations::cancel_sum_reservation,

        // --- Carts ---
        handlers::reservations::list_carts,
        handlers::reservations::create_cart,
        handlers::reservations::update_cart,
        handlers::reservations::delete_cart,
        handlers::reservations::list_cart_reservations,
        handlers::reservations::stream_cart_reservations,
        handlers::reservations::create_cart_reservation,
        handlers::reservations::cancel_cart_reservation,

        // --- Tickets ---
        handlers::tickets::list_tickets,
        handlers::tickets::create_ticket,
        handlers::tickets::ticket_stats,
        handlers::tickets::get_ticket,
        handlers::tickets::update_ticket,
        handlers::tickets::approve_ticket,
        handlers::tickets::reject_ticket,

        // --- Announcements ---
        handlers::announcements::list_announcements,
        handlers::announcements::create_announcement,
        handlers::announcements::delete_announcement,

        // --- Departments ---
        handlers::departments::list_active_departments,
        handlers::departments::my_department,
        handlers::departments::add_member,
        handlers::departments::remove_member,

        // --- Admin ---
        handlers::admin::list_users,
        handlers::admin::update_user,
        handlers::admin::login_audit,
        handlers::admin::get_modules,
        handlers::admin::update_modules,
        handlers::departments::list_departments,
        handlers::departments::create_department,
        handlers::departments::update_department,
        handlers::departments::delete_department,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::RoleTag,
            models::auth::Principal,
            models::auth::LoginOutcome,
            models::auth::LoginAuditEntry,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::UpdateUserPayload,
            handlers::auth::MeResponse,
            services::visibility::Permissions,

            // --- Modules ---
            models::modules::ModuleKey,
            models::modules::VisibilityState,
            models::modules::ModuleConfig,
            models::modules::ModuleVisibility,

            // --- Dashboard ---
            models::dashboard::ModuleCard,
            models::dashboard::DashboardSummary,

            // --- Calendar ---
            models::calendar::EventType,
            models::calendar::CapacityStep,
            models::calendar::CalendarEvent,
            models::calendar::DayView,
            models::calendar::MonthView,
            models::calendar::AdjustCapacityPayload,
            models::calendar::CreateEventPayload,

            // --- Reservations ---
            models::reservations::ResourceKind,
            models::reservations::TimeSlot,
            models::reservations::Reservation,
            models::reservations::Cart,
            models::reservations::CreateReservationPayload,
            models::reservations::CartPayload,

            // --- Tickets ---
            models::tickets::TicketType,
            models::tickets::Priority,
            models::tickets::TicketStatus,
            models::tickets::Ticket,
            models::tickets::CreateTicketPayload,
            models::tickets::UpdateTicketPayload,
            models::tickets::TicketStats,

            // --- Announcements ---
            models::announcements::Announcement,
            models::announcements::CreateAnnouncementPayload,

            // --- Departments ---
            models::departments::Department,
            models::departments::DepartmentPayload,
            models::departments::DepartmentWithMembers,
            models::departments::AddMemberPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Inicio de sesión con la cuenta institucional"),
        (name = "Users", description = "Perfil, permisos y navegación del usuario"),
        (name = "Dashboard", description = "Panel de inicio"),
        (name = "Calendar", description = "Huecos de guardia, festivos y eventos"),
        (name = "Reservations", description = "Reservas del SUM por franja"),
        (name = "Carts", description = "Carros de portátiles y sus reservas"),
        (name = "Tickets", description = "Peticiones TIC, mantenimiento e impresión 3D"),
        (name = "Announcements", description = "Tablón de anuncios"),
        (name = "Departments", description = "Departamentos y jefatura"),
        (name = "Admin", description = "Usuarios, módulos, auditoría y departamentos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
