//! Business logic services.

pub mod auth;
pub mod budget;
pub mod dashboard;
pub mod mailer;
pub mod report;
pub mod transaction;
