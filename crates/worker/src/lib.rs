//! Notification worker: configuration for the `quiet-worker` binary.
//!
//! The sweep itself lives in `quiet_events::NotificationSweeper`; this crate
//! only turns the environment into the pieces it needs.

pub mod config;
