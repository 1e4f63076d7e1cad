//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod quiet_hour_repo;
pub mod user_repo;

pub use quiet_hour_repo::QuietHourRepo;
pub use user_repo::UserRepo;
