//! Reminder delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send the
//! plain-text reminder for a window. Configuration is loaded from environment
//! variables; if `SMTP_HOST` is not set, [`EmailConfig::from_lookup`] returns
//! `Ok(None)` and the worker falls back to [`super::log::LogOnlyDelivery`].

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use quiet_db::models::quiet_hour::QuietHour;

use super::message::Reminder;
use super::{DeliveryAdapter, DeliveryError};
use crate::contacts::Recipient;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for DeliveryError {
    fn from(err: EmailError) -> Self {
        let retryable = match &err {
            EmailError::Transport(e) => !e.is_permanent(),
            EmailError::Address(_) | EmailError::Build(_) => false,
        };
        if retryable {
            DeliveryError::Retryable(err.to_string())
        } else {
            DeliveryError::Permanent(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// An SMTP variable is set but does not parse.
#[derive(Debug, thiserror::Error)]
pub enum EmailConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "Quiet Hours Scheduler <noreply@quiet-hours.local>";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" mailbox.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration through `lookup` (the process environment in the
    /// worker).
    ///
    /// Returns `Ok(None)` if `SMTP_HOST` is not set, signalling that reminders
    /// should only be logged. A malformed `SMTP_PORT` is an error.
    ///
    /// | Variable        | Required | Default                                              |
    /// |-----------------|----------|------------------------------------------------------|
    /// | `SMTP_HOST`     | yes      | -                                                    |
    /// | `SMTP_PORT`     | no       | `587`                                                |
    /// | `SMTP_FROM`     | no       | `Quiet Hours Scheduler <noreply@quiet-hours.local>`  |
    /// | `SMTP_USER`     | no       | -                                                    |
    /// | `SMTP_PASSWORD` | no       | -                                                    |
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, EmailConfigError> {
        let Some(smtp_host) = lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };
        let smtp_port = match lookup("SMTP_PORT") {
            None => DEFAULT_SMTP_PORT,
            Some(raw) => raw.trim().parse().map_err(|_| EmailConfigError::Invalid {
                var: "SMTP_PORT",
                value: raw,
            })?,
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port,
            from_address: lookup("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: lookup("SMTP_USER"),
            smtp_password: lookup("SMTP_PASSWORD"),
        }))
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends reminder emails via SMTP.
pub struct EmailDelivery {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Build the transport once. Fails on an unparseable sender or relay
    /// host so misconfiguration surfaces at startup, not on first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let from: Mailbox = config.from_address.parse()?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            transport_builder = transport_builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from,
            mailer: transport_builder.build(),
        })
    }

    fn build_message(&self, to_email: &str, window: &QuietHour) -> Result<Message, EmailError> {
        let reminder = Reminder::for_window(window);
        Message::builder()
            .from(self.from.clone())
            .to(to_email.parse()?)
            .subject(reminder.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(reminder.body)
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    async fn send(&self, to_email: &str, window: &QuietHour) -> Result<(), EmailError> {
        let email = self.build_message(to_email, window)?;
        self.mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryAdapter for EmailDelivery {
    async fn deliver(
        &self,
        recipient: &Recipient,
        window: &QuietHour,
    ) -> Result<(), DeliveryError> {
        self.send(&recipient.email, window).await?;
        tracing::info!(
            window_id = window.id,
            to = %recipient.email,
            "Reminder email sent"
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "email"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
