//! # tether-db
//!
//! libSQL-backed sessions for Tether audits.
//!
//! [`LibsqlProvider`] resolves a validated database name to a file in the
//! configured data directory and opens it with the `libsql` crate. Every
//! check gets its own connection from the shared [`LibsqlSession`], so
//! `TEMP` scratch tables never leak between checks.

pub mod error;
pub mod provider;
pub mod value;

pub use error::DatabaseError;
pub use provider::{LibsqlConnection, LibsqlProvider, LibsqlSession};
