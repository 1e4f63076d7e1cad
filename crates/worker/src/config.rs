use quiet_core::error::CoreError;
use quiet_core::notification::{NotificationPolicy, PolicySettings};
use quiet_events::{EmailConfig, EmailConfigError};

/// A required variable is missing or a value does not parse.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    Policy(#[from] CoreError),
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub policy: NotificationPolicy,
    /// `None` means reminders are only logged.
    pub email: Option<EmailConfig>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `DATABASE_URL`             | required   |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`       |
    /// | `NOTIFY_LEAD_TIME_SECS`    | `600`      |
    /// | `NOTIFY_TOLERANCE_SECS`    | `30`       |
    /// | `SWEEP_INTERVAL_SECS`      | `60`       |
    /// | `DELIVERY_TIMEOUT_SECS`    | `30`       |
    /// | `DELIVERY_MAX_ATTEMPTS`    | `3`        |
    /// | `CLAIM_TTL_SECS`           | `300`      |
    /// | `SWEEP_CONCURRENCY`        | `4`        |
    ///
    /// SMTP settings are read by [`EmailConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database_max_connections = parse_or(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            quiet_db::DEFAULT_MAX_CONNECTIONS,
        )?;

        let defaults = PolicySettings::default();
        let settings = PolicySettings {
            lead_time_secs: parse_or(&lookup, "NOTIFY_LEAD_TIME_SECS", defaults.lead_time_secs)?,
            tolerance_secs: parse_or(&lookup, "NOTIFY_TOLERANCE_SECS", defaults.tolerance_secs)?,
            sweep_interval_secs: parse_or(
                &lookup,
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )?,
            delivery_timeout_secs: parse_or(
                &lookup,
                "DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout_secs,
            )?,
            max_attempts: parse_or(&lookup, "DELIVERY_MAX_ATTEMPTS", defaults.max_attempts)?,
            claim_ttl_secs: parse_or(&lookup, "CLAIM_TTL_SECS", defaults.claim_ttl_secs)?,
            concurrency: parse_or(&lookup, "SWEEP_CONCURRENCY", defaults.concurrency)?,
        };
        let policy = NotificationPolicy::new(settings)?;
        let email = EmailConfig::from_lookup(&lookup)
            .map_err(|EmailConfigError::Invalid { var, value }| ConfigError::Invalid { var, value })?;

        Ok(Self {
            database_url,
            database_max_connections,
            policy,
            email,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgres://localhost/quiet");

    #[test]
    fn defaults_with_only_database_url() {
        let config = WorkerConfig::from_lookup(lookup(&[DB])).unwrap();
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.policy.lead_time().num_seconds(), 600);
        assert_eq!(config.policy.tolerance().num_seconds(), 30);
        assert_eq!(config.policy.sweep_interval().as_secs(), 60);
        assert_eq!(config.policy.delivery_timeout().as_secs(), 30);
        assert_eq!(config.policy.max_attempts(), 3);
        assert_eq!(config.policy.concurrency(), 4);
        assert!(config.email.is_none());
    }

    #[test]
    fn database_url_is_required() {
        let err = WorkerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_matches!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = WorkerConfig::from_lookup(lookup(&[
            DB,
            ("NOTIFY_LEAD_TIME_SECS", "300"),
            ("SWEEP_INTERVAL_SECS", "20"),
            ("NOTIFY_TOLERANCE_SECS", "10"),
            ("SWEEP_CONCURRENCY", " 8 "),
        ]))
        .unwrap();
        assert_eq!(config.policy.lead_time().num_seconds(), 300);
        assert_eq!(config.policy.sweep_interval().as_secs(), 20);
        assert_eq!(config.policy.concurrency(), 8);
    }

    #[test]
    fn unparsable_number_names_the_variable() {
        let err = WorkerConfig::from_lookup(lookup(&[DB, ("DELIVERY_MAX_ATTEMPTS", "three")]))
            .unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid { var: "DELIVERY_MAX_ATTEMPTS", value } if value == "three"
        );
    }

    #[test]
    fn tolerance_narrower_than_half_the_cadence_is_rejected() {
        let err = WorkerConfig::from_lookup(lookup(&[
            DB,
            ("SWEEP_INTERVAL_SECS", "120"),
            ("NOTIFY_TOLERANCE_SECS", "30"),
        ]))
        .unwrap_err();
        assert_matches!(err, ConfigError::Policy(CoreError::Validation(_)));
    }

    #[test]
    fn malformed_smtp_port_fails_startup() {
        let err = WorkerConfig::from_lookup(lookup(&[
            DB,
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "25x"),
        ]))
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "SMTP_PORT", value } if value == "25x");
    }

    #[test]
    fn smtp_host_enables_email() {
        let config =
            WorkerConfig::from_lookup(lookup(&[DB, ("SMTP_HOST", "smtp.example.com")])).unwrap();
        let email = config.email.unwrap();
        assert_eq!(email.smtp_host, "smtp.example.com");
        assert_eq!(email.smtp_port, 587);
    }
}
