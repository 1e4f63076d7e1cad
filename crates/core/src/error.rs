use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "QuietHour",
            id: 7,
        };
        assert_eq!(err.to_string(), "Entity not found: QuietHour with id 7");
    }

    #[test]
    fn conflict_display() {
        let err = CoreError::Conflict("overlap".into());
        assert_eq!(err.to_string(), "Conflict: overlap");
    }
}
