pub mod admin;
pub mod announcements;
pub mod auth;
pub mod calendar;
pub mod dashboard;
pub mod departments;
pub mod reservations;
pub mod tickets;
