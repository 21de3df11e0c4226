pub mod user_repo;
pub use user_repo::UserRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod module_repo;
pub use module_repo::ModuleRepository;
pub mod calendar_repo;
pub use calendar_repo::CalendarRepository;
pub mod reservation_repo;
pub use reservation_repo::ReservationRepository;
pub mod ticket_repo;
pub use ticket_repo::TicketRepository;
pub mod department_repo;
pub use department_repo::DepartmentRepository;
pub mod announcement_repo;
pub use announcement_repo::AnnouncementRepository;
