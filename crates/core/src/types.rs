/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Random marker written by a sweep when it claims a window for delivery.
pub type ClaimToken = uuid::Uuid;
