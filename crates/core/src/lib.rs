//! Domain core for the quiet-hours scheduler.
//!
//! Zero internal dependencies: shared id/timestamp types, the domain error
//! enum, interval arithmetic, write-input validation and the notification
//! policy plus its per-window state machine. Used by the repository layer,
//! the sweeper and the HTTP API alike.

pub mod error;
pub mod interval;
pub mod notification;
pub mod quiet_hour;
pub mod types;
