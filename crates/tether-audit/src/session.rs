//! Session provisioning contract.
//!
//! The audit core never opens database handles itself. A [`SessionProvider`]
//! hands out one [`DbSession`] per run, bound to one target database; each
//! check then asks the session for its own [`SessionConnection`] so checks
//! can run statements concurrently and scratch objects stay private to the
//! check that created them.

use std::future::Future;
use std::sync::Arc;

use tether_core::{AuditError, DatabaseName, Row, SessionError};

/// A connection scoped to a single check execution.
pub trait SessionConnection: Send + Sync {
    /// Run one or more statements, discarding any rows.
    fn execute_batch(&self, sql: &str) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Run a query and collect every row, in order, with all returned columns.
    fn query(&self, sql: &str) -> impl Future<Output = Result<Vec<Row>, SessionError>> + Send;
}

/// A live session bound to one target database.
///
/// Shared read-only across every check of a run.
pub trait DbSession: Send + Sync + 'static {
    type Connection: SessionConnection;

    fn database_name(&self) -> &DatabaseName;

    /// Open a connection for one check.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, SessionError>> + Send;
}

/// Source of sessions for audit runs.
pub trait SessionProvider: Send + Sync + 'static {
    type Session: DbSession;

    /// Open a session bound to `name`.
    ///
    /// Fails with [`AuditError::DatabaseNotFound`] when the schema does not
    /// exist, or [`AuditError::Connection`] on transport failure.
    fn acquire(
        &self,
        name: &DatabaseName,
    ) -> impl Future<Output = Result<Self::Session, AuditError>> + Send;

    /// Return a session. Must be idempotent.
    fn release(&self, session: &Self::Session);
}

/// Scoped ownership of an acquired session.
///
/// Releases the session exactly once: through [`SessionLease::release`] on
/// the normal path, or on drop when the run unwinds or is aborted.
pub struct SessionLease<P: SessionProvider> {
    provider: Arc<P>,
    session: Arc<P::Session>,
    released: bool,
}

impl<P: SessionProvider> SessionLease<P> {
    pub fn new(provider: Arc<P>, session: P::Session) -> Self {
        Self {
            provider,
            session: Arc::new(session),
            released: false,
        }
    }

    /// Shared handle for dispatching checks.
    #[must_use]
    pub const fn session(&self) -> &Arc<P::Session> {
        &self.session
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            tracing::debug!(database = %self.session.database_name(), "releasing session");
            self.provider.release(&self.session);
        }
    }
}

impl<P: SessionProvider> Drop for SessionLease<P> {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::testing::ScriptedProvider;

    use super::*;

    #[tokio::test]
    async fn explicit_release_happens_once() {
        let provider = Arc::new(ScriptedProvider::new());
        let name = DatabaseName::parse("Sales").unwrap();
        let session = provider.acquire(&name).await.unwrap();

        let lease = SessionLease::new(Arc::clone(&provider), session);
        lease.release();

        assert_eq!(provider.acquired(), 1);
        assert_eq!(provider.released(), 1);
    }

    #[tokio::test]
    async fn drop_releases_when_not_released_explicitly() {
        let provider = Arc::new(ScriptedProvider::new());
        let name = DatabaseName::parse("Sales").unwrap();
        let session = provider.acquire(&name).await.unwrap();

        {
            let _lease = SessionLease::new(Arc::clone(&provider), session);
        }

        assert_eq!(provider.released(), 1);
    }

    #[tokio::test]
    async fn released_session_refuses_connections() {
        let provider = Arc::new(ScriptedProvider::new());
        let name = DatabaseName::parse("Sales").unwrap();
        let session = provider.acquire(&name).await.unwrap();
        let lease = SessionLease::new(Arc::clone(&provider), session);
        let shared = Arc::clone(lease.session());
        lease.release();

        let err = shared.connect().await.err().unwrap();
        assert!(matches!(err, SessionError::Released(_)));
    }
}
