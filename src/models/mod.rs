//! Database models and DTOs for all domain entities.

pub mod budget;
pub mod money;
pub mod month;
pub mod query;
pub mod transaction;
pub mod user;
