//! File-backed session provider.
//!
//! Databases are addressed by name inside a single data directory. A name
//! resolves to the first existing file among `<name>`, `<name>.db`,
//! `<name>.sqlite` and `<name>.sqlite3`; nothing outside the directory can
//! be reached and no file is ever created.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use libsql::Builder;
use tether_audit::{DbSession, SessionConnection, SessionProvider};
use tether_config::DatabaseConfig;
use tether_core::{AuditError, DatabaseName, Row, SessionError};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::value::collect_rows;

/// Recognised database file extensions, in resolution order.
pub const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// Hands out libSQL sessions for databases in a data directory.
#[derive(Debug, Clone)]
pub struct LibsqlProvider {
    data_dir: PathBuf,
    foreign_keys: bool,
}

impl LibsqlProvider {
    pub fn new(data_dir: impl Into<PathBuf>, foreign_keys: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            foreign_keys,
        }
    }

    #[must_use]
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.data_dir.clone(), config.foreign_keys)
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the database file for `name`, if one exists.
    #[must_use]
    pub fn resolve(&self, name: &DatabaseName) -> Option<PathBuf> {
        std::iter::once(self.data_dir.join(name.as_str()))
            .chain(
                DATABASE_EXTENSIONS
                    .iter()
                    .map(|ext| self.data_dir.join(format!("{name}.{ext}"))),
            )
            .find(|path| path.is_file())
    }

    /// Names of the databases available for auditing, sorted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DataDir` if the data directory cannot be read.
    pub async fn list_databases(&self) -> Result<Vec<String>, DatabaseError> {
        let data_dir_error = |source| DatabaseError::DataDir {
            path: self.data_dir.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.data_dir)
            .await
            .map_err(data_dir_error)?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(data_dir_error)? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let has_db_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| DATABASE_EXTENSIONS.contains(&ext));
            if !has_db_extension {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if let Ok(name) = DatabaseName::parse(stem) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl SessionProvider for LibsqlProvider {
    type Session = LibsqlSession;

    async fn acquire(&self, name: &DatabaseName) -> Result<Self::Session, AuditError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| AuditError::DatabaseNotFound(name.to_string()))?;
        debug!(database = %name, path = %path.display(), "opening database");

        let db = Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| AuditError::Connection(format!("failed to open '{name}': {e}")))?;

        // A file that is not a SQLite database only fails once it is read.
        let first = db
            .connect()
            .map_err(|e| AuditError::Connection(format!("failed to connect to '{name}': {e}")))?;
        first
            .query("SELECT count(*) FROM sqlite_master", ())
            .await
            .map_err(|e| AuditError::Connection(format!("failed to read '{name}': {e}")))?;

        info!(database = %name, foreign_keys = self.foreign_keys, "session acquired");
        Ok(LibsqlSession {
            name: name.clone(),
            db: Arc::new(db),
            foreign_keys: self.foreign_keys,
            released: AtomicBool::new(false),
        })
    }

    fn release(&self, session: &Self::Session) {
        if !session.released.swap(true, Ordering::SeqCst) {
            debug!(database = %session.name, "session released");
        }
    }
}

/// A session bound to one database file.
pub struct LibsqlSession {
    name: DatabaseName,
    db: Arc<libsql::Database>,
    foreign_keys: bool,
    released: AtomicBool,
}

impl LibsqlSession {
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl DbSession for LibsqlSession {
    type Connection = LibsqlConnection;

    fn database_name(&self) -> &DatabaseName {
        &self.name
    }

    async fn connect(&self) -> Result<Self::Connection, SessionError> {
        if self.is_released() {
            return Err(SessionError::Released(self.name.to_string()));
        }
        let conn = self
            .db
            .connect()
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        // Enforcement is per connection in SQLite.
        let pragma = if self.foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        conn.execute(pragma, ())
            .await
            .map_err(|e| SessionError::Connection(format!("{pragma}: {e}")))?;

        Ok(LibsqlConnection { conn })
    }
}

/// A connection used by a single check.
///
/// Local libSQL statements run to completion inside `poll`, so each one is
/// moved to the blocking pool where it cannot hold up timers or other
/// checks. Dropping a pending statement interrupts it.
pub struct LibsqlConnection {
    conn: libsql::Connection,
}

impl LibsqlConnection {
    async fn run_blocking<T, F, Fut>(&self, work: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(libsql::Connection) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DatabaseError>>,
    {
        let conn = self.conn.clone();
        let runtime = Handle::current();
        let interrupter = Interrupter::new(&self.conn);
        let cancelled = interrupter.flag();

        let joined = tokio::task::spawn_blocking(move || {
            if cancelled.load(Ordering::SeqCst) {
                return Err(DatabaseError::Interrupted);
            }
            runtime.block_on(work(conn))
        })
        .await;
        interrupter.disarm();
        joined?
    }
}

impl SessionConnection for LibsqlConnection {
    async fn execute_batch(&self, sql: &str) -> Result<(), SessionError> {
        let sql = sql.to_owned();
        self.run_blocking(move |conn| async move {
            conn.execute_batch(&sql).await?;
            Ok::<_, DatabaseError>(())
        })
        .await?;
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>, SessionError> {
        let sql = sql.to_owned();
        let rows = self
            .run_blocking(move |conn| async move {
                let rows = conn.query(&sql, ()).await?;
                Ok::<_, DatabaseError>(collect_rows(rows).await?)
            })
            .await?;
        Ok(rows)
    }
}

/// Interrupts the connection's running statement when dropped while armed.
///
/// A statement that has not started yet sees the cancelled flag instead.
struct Interrupter<'a> {
    conn: &'a libsql::Connection,
    cancelled: Arc<AtomicBool>,
    armed: bool,
}

impl<'a> Interrupter<'a> {
    fn new(conn: &'a libsql::Connection) -> Self {
        Self {
            conn,
            cancelled: Arc::new(AtomicBool::new(false)),
            armed: true,
        }
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Interrupter<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.cancelled.store(true, Ordering::SeqCst);
        match self.conn.interrupt() {
            Ok(()) => debug!("statement interrupted"),
            Err(error) => warn!(%error, "failed to interrupt statement"),
        }
    }
}
