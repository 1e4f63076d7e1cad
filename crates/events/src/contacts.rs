//! Owner contact lookup.
//!
//! Identity lives with the external auth provider; the sweeper only needs an
//! address to send to. [`PgContactResolver`] reads the `users` table and
//! [`StaticContacts`] serves a fixed map for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use quiet_core::types::DbId;
use quiet_db::repositories::UserRepo;
use quiet_db::DbPool;

/// Where a reminder goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: DbId,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("User {0} not found")]
    UserNotFound(DbId),

    #[error("User {0} has no email address")]
    NoAddress(DbId),

    #[error("Contact lookup failed: {0}")]
    Lookup(String),
}

#[async_trait]
pub trait ContactResolver: Send + Sync {
    async fn resolve(&self, user_id: DbId) -> Result<Recipient, ContactError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

pub struct PgContactResolver {
    pool: DbPool,
}

impl PgContactResolver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactResolver for PgContactResolver {
    async fn resolve(&self, user_id: DbId) -> Result<Recipient, ContactError> {
        let user = UserRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(|e| ContactError::Lookup(e.to_string()))?
            .ok_or(ContactError::UserNotFound(user_id))?;

        let email = user
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(ContactError::NoAddress(user_id))?;

        Ok(Recipient {
            user_id,
            email,
            display_name: user.display_name,
        })
    }
}

// ---------------------------------------------------------------------------
// Static map
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct StaticContacts {
    emails: HashMap<DbId, String>,
}

impl StaticContacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, user_id: DbId, email: impl Into<String>) -> Self {
        self.emails.insert(user_id, email.into());
        self
    }
}

#[async_trait]
impl ContactResolver for StaticContacts {
    async fn resolve(&self, user_id: DbId) -> Result<Recipient, ContactError> {
        match self.emails.get(&user_id) {
            None => Err(ContactError::UserNotFound(user_id)),
            Some(email) if email.is_empty() => Err(ContactError::NoAddress(user_id)),
            Some(email) => Ok(Recipient {
                user_id,
                email: email.clone(),
                display_name: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn static_contacts_resolve_known_users() {
        let contacts = StaticContacts::new().with(1, "a@example.com").with(2, "");
        assert_eq!(contacts.resolve(1).await.unwrap().email, "a@example.com");
        assert_matches!(contacts.resolve(2).await, Err(ContactError::NoAddress(2)));
        assert_matches!(contacts.resolve(3).await, Err(ContactError::UserNotFound(3)));
    }
}
