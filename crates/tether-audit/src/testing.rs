//! Scripted in-memory sessions.
//!
//! [`ScriptedProvider`] answers statements from a lookup table keyed by the
//! exact SQL text, so catalogs and the orchestrator can be exercised without
//! a database. Unknown statements succeed with no rows. The provider counts
//! acquisitions and releases and records every statement it sees.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tether_core::{AuditError, DatabaseName, Row, SessionError};

use crate::session::{DbSession, SessionConnection, SessionProvider};

/// Scripted reaction to one statement.
#[derive(Debug, Clone)]
pub enum Scripted {
    Rows(Vec<Row>),
    Error(String),
    Delayed(Duration, Vec<Row>),
    Panic(String),
}

#[derive(Debug, Default)]
struct Shared {
    responses: HashMap<String, Scripted>,
    statements: Mutex<Vec<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// In-memory [`SessionProvider`] driven by a statement table.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    shared: Arc<Shared>,
    databases: Option<Vec<String>>,
    unreachable: bool,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn respond(mut self, sql: &str, response: Scripted) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.responses.insert(sql.to_string(), response);
        }
        self
    }

    #[must_use]
    pub fn with_rows(self, sql: &str, rows: Vec<Row>) -> Self {
        self.respond(sql, Scripted::Rows(rows))
    }

    #[must_use]
    pub fn with_error(self, sql: &str, message: &str) -> Self {
        self.respond(sql, Scripted::Error(message.to_string()))
    }

    #[must_use]
    pub fn with_delay(self, sql: &str, delay: Duration, rows: Vec<Row>) -> Self {
        self.respond(sql, Scripted::Delayed(delay, rows))
    }

    #[must_use]
    pub fn with_panic(self, sql: &str, message: &str) -> Self {
        self.respond(sql, Scripted::Panic(message.to_string()))
    }

    /// Restrict acquisition to the named databases.
    #[must_use]
    pub fn with_databases(mut self, names: &[&str]) -> Self {
        self.databases = Some(names.iter().map(ToString::to_string).collect());
        self
    }

    /// Make every acquisition fail with a connection error.
    #[must_use]
    pub const fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Number of successful `acquire` calls.
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.shared.acquired.load(Ordering::SeqCst)
    }

    /// Number of `release` calls.
    #[must_use]
    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    /// Highest number of statements that were running at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every statement executed so far, in arrival order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.shared
            .statements
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl SessionProvider for ScriptedProvider {
    type Session = ScriptedSession;

    async fn acquire(&self, name: &DatabaseName) -> Result<Self::Session, AuditError> {
        if self.unreachable {
            return Err(AuditError::Connection(format!(
                "failed to connect to '{name}': connection refused"
            )));
        }
        if let Some(known) = &self.databases {
            if !known.iter().any(|db| db == name.as_str()) {
                return Err(AuditError::DatabaseNotFound(name.to_string()));
            }
        }
        self.shared.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            name: name.clone(),
            shared: Arc::clone(&self.shared),
            released: Arc::new(AtomicBool::new(false)),
        })
    }

    fn release(&self, session: &Self::Session) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
        session.released.store(true, Ordering::SeqCst);
    }
}

/// Session handed out by [`ScriptedProvider`].
#[derive(Debug)]
pub struct ScriptedSession {
    name: DatabaseName,
    shared: Arc<Shared>,
    released: Arc<AtomicBool>,
}

impl DbSession for ScriptedSession {
    type Connection = ScriptedConnection;

    fn database_name(&self) -> &DatabaseName {
        &self.name
    }

    async fn connect(&self) -> Result<Self::Connection, SessionError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(SessionError::Released(self.name.to_string()));
        }
        Ok(ScriptedConnection {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Connection handed out by [`ScriptedSession`].
#[derive(Debug)]
pub struct ScriptedConnection {
    shared: Arc<Shared>,
}

impl ScriptedConnection {
    fn record(&self, sql: &str) {
        if let Ok(mut statements) = self.shared.statements.lock() {
            statements.push(sql.to_string());
        }
    }

    async fn run(&self, sql: &str) -> Result<Vec<Row>, SessionError> {
        self.record(sql);
        let _guard = InFlight::enter(&self.shared);
        match self.shared.responses.get(sql).cloned() {
            None => Ok(Vec::new()),
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Error(message)) => Err(SessionError::Query(message)),
            Some(Scripted::Delayed(delay, rows)) => {
                tokio::time::sleep(delay).await;
                Ok(rows)
            }
            Some(Scripted::Panic(message)) => panic!("{message}"),
        }
    }
}

struct InFlight<'a>(&'a Shared);

impl<'a> InFlight<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let now = shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        shared.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SessionConnection for ScriptedConnection {
    async fn execute_batch(&self, sql: &str) -> Result<(), SessionError> {
        self.run(sql).await.map(|_| ())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, SessionError> {
        self.run(sql).await
    }
}
