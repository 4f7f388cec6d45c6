//! Database error types for tether-db.

use tether_core::SessionError;
use thiserror::Error;

/// Errors from libSQL-backed operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The data directory could not be read.
    #[error("Cannot read data directory '{path}': {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// The statement was abandoned before it ran.
    #[error("statement interrupted")]
    Interrupted,

    /// The blocking task running a statement failed.
    #[error("statement worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<DatabaseError> for SessionError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::LibSql(inner) => Self::Query(inner.to_string()),
            other @ (DatabaseError::Interrupted | DatabaseError::Worker(_)) => {
                Self::Query(other.to_string())
            }
            other @ DatabaseError::DataDir { .. } => Self::Connection(other.to_string()),
        }
    }
}
