//! User contact model.

use quiet_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
///
/// Identity lives with the external auth provider; this table only carries
/// what the sweeper needs to reach a user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: Option<String>,
    pub display_name: String,
    pub created_at: Timestamp,
}

/// DTO for registering a user's contact details.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: Option<String>,
    pub display_name: String,
}
