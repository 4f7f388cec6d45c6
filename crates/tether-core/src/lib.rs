//! # tether-core
//!
//! Core types, validated identifiers, and error types for Tether.
//!
//! This crate provides the foundational types shared across all Tether crates:
//! - [`DatabaseName`], the allow-listed identifier used to target a schema
//! - [`Row`] and typed field accessors for check result rows
//! - [`CheckStatus`] and [`CheckFailure`] for per-check outcomes
//! - Cross-cutting error types ([`AuditError`], [`SessionError`])

pub mod database_name;
pub mod errors;
pub mod row;
pub mod status;

pub use database_name::DatabaseName;
pub use errors::{AuditError, SessionError};
pub use row::Row;
pub use status::{CheckFailure, CheckStatus};
