use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Error type returned by every public catalog operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown kind: {0}")]
    UnknownKind(String),

    #[error("unrecognized kind: {0}")]
    UnrecognizedKind(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("conflict: expected version {expected}, found {actual}")]
    ConflictNotApplied { expected: i64, actual: i64 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} {id}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
