//! Per-check execution status.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a single check ended within an audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Failed,
    TimedOut,
    Cancelled,
}

impl CheckStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Why a check produced no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// The statement (or its setup/teardown) raised an error.
    Query(String),
    /// The check exceeded its per-check time limit.
    TimedOut { after: Duration },
    /// The run was cancelled or hit its overall deadline while the check was in flight.
    Cancelled,
    /// The task running the check panicked.
    Panicked(String),
}

impl CheckFailure {
    /// Status reported for this failure.
    #[must_use]
    pub const fn status(&self) -> CheckStatus {
        match self {
            Self::Query(_) | Self::Panicked(_) => CheckStatus::Failed,
            Self::TimedOut { .. } => CheckStatus::TimedOut,
            Self::Cancelled => CheckStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(msg) => write!(f, "{msg}"),
            Self::TimedOut { after } => write!(f, "check timed out after {after:?}"),
            Self::Cancelled => f.write_str("check cancelled before completion"),
            Self::Panicked(msg) => write!(f, "check panicked: {msg}"),
        }
    }
}
