pub mod announcement_service;
pub mod auth;
pub mod calendar_service;
pub mod change_feed;
pub mod dashboard_service;
pub mod department_service;
pub mod identity;
pub mod reservation_service;
pub mod ticket_service;
pub mod user_service;
pub mod visibility;
