//! Cross-cutting error types for Tether.
//!
//! Two tiers exist. [`AuditError`] is a pre-condition failure that aborts a
//! whole audit run. [`SessionError`] is what a session implementation
//! returns for a single statement; the executor turns it into a
//! [`CheckFailure`](crate::CheckFailure) and never lets it escape a run.

use thiserror::Error;

/// Errors that abort an audit run before any report is built.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The caller supplied an empty or malformed database name.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The named database does not exist in the configured data directory.
    #[error("Database '{0}' does not exist")]
    DatabaseNotFound(String),

    /// The database exists but a session could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A check catalog was declared with conflicting entries.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Audit settings were rejected.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuditError {
    /// Whether the error was caused by caller input rather than the environment.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::DatabaseNotFound(_))
    }
}

/// Errors raised by a database session while running a single statement.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session was already released back to its provider.
    #[error("Session for '{0}' has been released")]
    Released(String),

    /// Opening a per-check connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Statement preparation or execution failed.
    #[error("Query failed: {0}")]
    Query(String),
}
