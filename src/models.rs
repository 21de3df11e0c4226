pub mod announcements;
pub mod auth;
pub mod calendar;
pub mod dashboard;
pub mod departments;
pub mod modules;
pub mod reservations;
pub mod tickets;
