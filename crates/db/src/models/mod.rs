//! Row models and DTOs.

pub mod quiet_hour;
pub mod user;
