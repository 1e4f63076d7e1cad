//! Reminder delivery for quiet hours.
//!
//! - [`delivery`]: outbound channels behind the [`DeliveryAdapter`] trait
//!   (SMTP email, log-only) and the reminder text they send.
//! - [`contacts`]: resolves a window owner to a [`Recipient`].
//! - [`NotificationSweeper`]: the periodic job that finds windows about to
//!   start, claims them, and sends exactly one reminder each.

pub mod contacts;
pub mod delivery;
pub mod sweeper;

pub use contacts::{ContactError, ContactResolver, PgContactResolver, Recipient, StaticContacts};
pub use delivery::email::{EmailConfig, EmailConfigError, EmailDelivery};
pub use delivery::log::LogOnlyDelivery;
pub use delivery::{DeliveryAdapter, DeliveryError};
pub use sweeper::{NotificationSweeper, SweepSummary};
