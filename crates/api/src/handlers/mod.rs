//! Request handlers.
//!
//! Handlers delegate to [`quiet_db::service::WindowService`] and map errors
//! via [`crate::error::AppError`].

pub mod quiet_hour;
