//! Repository error types.

use unchained_core::SpecificationError;

/// Errors raised by repository operations.
///
/// `NotFound` and `Conflict` are expected outcomes a caller can branch on;
/// `Database` carries driver failures through untouched.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Entity not found in repository
    #[error("entity not found: {0}")]
    NotFound(String),

    /// A write violated a uniqueness constraint
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller supplied something the repository cannot act on
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid specification: {0}")]
    Specification(#[from] SpecificationError),

    /// The context was canceled before the operation finished
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed before the operation finished
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl RepositoryError {
    #[must_use]
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} '{id}'"))
    }

    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// True for [`NotFound`](Self::NotFound).
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            _ => Self::Database(error),
        }
    }
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_formats_entity_and_id() {
        let err = RepositoryError::not_found("accounts", 7);
        assert_eq!(err.to_string(), "entity not found: accounts '7'");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_specification_error_converts() {
        let err: RepositoryError = SpecificationError::EmptyComposite("AND").into();
        assert!(matches!(err, RepositoryError::Specification(_)));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: RepositoryError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
