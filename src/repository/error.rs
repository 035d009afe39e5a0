// ==========================================
// Warehouse Receipting - repository layer error types
// ==========================================
// Tooling: thiserror derive macros
// Validation messages are caller-visible and must stay stable; the HTTP
// shell surfaces them verbatim.
// ==========================================

use thiserror::Error;

/// Repository layer error type
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== Caller errors =====
    #[error("{0}")]
    Validation(String),

    #[error("project {project_id} is not active")]
    ReadOnlyProject { project_id: i64 },

    #[error("pallet {pallet_id} is read-only (status={status})")]
    ReadOnlyPallet { pallet_id: i64, status: String },

    #[error("invalid pallet transition: from={from} to={to}")]
    InvalidTransition { from: String, to: String },

    #[error("pallet {pallet_id} is not closed")]
    PalletNotClosed { pallet_id: i64 },

    #[error("{entity} not found: id={id}")]
    NotFound { entity: String, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    // ===== Cancellation =====
    #[error("operation cancelled")]
    Cancelled,

    // ===== Database errors =====
    #[error("database lock failed: {0}")]
    LockError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("database query failed: {0}")]
    DatabaseQueryError(String),

    // ===== Generic =====
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// Shorthand for NotFound with an integer id.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// True when the failure is a caller-side validation error (the write
    /// transaction is still rolled back, but the message is safe to show).
    pub fn is_validation(&self) -> bool {
        matches!(self, RepositoryError::Validation(_))
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::Conflict(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::Conflict(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Internal(format!("json serialisation failed: {err}"))
    }
}

impl From<csv::Error> for RepositoryError {
    fn from(err: csv::Error) -> Self {
        RepositoryError::Validation(format!("csv error: {err}"))
    }
}

/// Result type alias
pub type RepositoryResult<T> = Result<T, RepositoryError>;
