//! # tether-audit
//!
//! Schema-integrity auditing for Tether.
//!
//! - [`catalog`]: the fixed, ordered list of checks and their scripts
//! - [`session`]: the provider/session/connection contract a backend implements
//! - [`executor`]: runs one check with a timeout and guaranteed teardown
//! - [`orchestrator`]: the [`Auditor`] that fans checks out and collects a report
//! - [`report`] and [`summary`]: the aggregate result and its derived counts
//! - `testing` (behind the `testing` feature): a scripted in-memory provider for tests

pub mod catalog;
pub mod executor;
pub mod orchestrator;
pub mod report;
pub mod session;
pub mod summary;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use catalog::{Catalog, Check, CheckScript};
pub use orchestrator::{AuditSettings, Auditor};
pub use report::{AuditReport, CheckOutcome, CheckResult};
pub use session::{DbSession, SessionConnection, SessionLease, SessionProvider};
pub use summary::AuditSummary;
