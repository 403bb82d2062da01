use std::path::PathBuf;

use annostore_core::error::CoreError;

/// Error type for blob store and document service operations.
///
/// Wraps [`CoreError`] for domain errors and adds storage-specific variants.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain-level error from `annostore_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The blob repository could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blob exists but does not hold a readable annotation graph.
    #[error("Corrupt annotation blob {}: {source}", path.display())]
    CorruptBlob {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for store return values.
pub type StoreResult<T> = Result<T, StoreError>;

/// Caller-facing classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DuplicateConflict,
    ConversionFailure,
    IoFailure,
    InvariantViolation,
    Validation,
    Internal,
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(core) => match core {
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::Conflict(_) => ErrorKind::DuplicateConflict,
                CoreError::Conversion { .. } => ErrorKind::ConversionFailure,
                CoreError::InvariantViolation(_) => ErrorKind::InvariantViolation,
                CoreError::Validation(_) => ErrorKind::Validation,
                CoreError::Internal(_) => ErrorKind::Internal,
            },
            Self::Database(sqlx::Error::RowNotFound) => ErrorKind::NotFound,
            Self::Database(err) if annostore_db::is_unique_violation(err) => {
                ErrorKind::DuplicateConflict
            }
            Self::Database(_) => ErrorKind::Internal,
            Self::Io { .. } | Self::CorruptBlob { .. } => ErrorKind::IoFailure,
        }
    }

    /// Whether this is a "does not exist" outcome rather than a failure.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
