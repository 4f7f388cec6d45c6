//! Audit run limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_check_timeout_secs() -> u64 {
    30
}

const fn default_audit_timeout_secs() -> u64 {
    120
}

const fn default_max_concurrency() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Time limit for a single check before it is reported as timed out.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Time limit for a whole run. In-flight checks are cancelled when it expires.
    #[serde(default = "default_audit_timeout_secs")]
    pub audit_timeout_secs: u64,

    /// Upper bound on checks executing at once (further capped by catalog size).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            check_timeout_secs: default_check_timeout_secs(),
            audit_timeout_secs: default_audit_timeout_secs(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl AuditConfig {
    #[must_use]
    pub const fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    #[must_use]
    pub const fn audit_timeout(&self) -> Duration {
        Duration::from_secs(self.audit_timeout_secs)
    }
}
