#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The format importer or the schema service rejected a document.
    #[error("The reader for format [{format}] is unable to digest data: {cause}")]
    Conversion { format: String, cause: String },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn conversion(format: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Conversion {
            format: format.into(),
            cause: cause.to_string(),
        }
    }
}
