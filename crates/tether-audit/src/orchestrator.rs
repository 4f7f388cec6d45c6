//! Audit orchestration.
//!
//! An [`Auditor`] validates the target name, acquires one session, fans the
//! catalog out across concurrent tasks, waits for all of them (or for
//! cancellation / the run deadline), releases the session and assembles the
//! report.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tether_config::AuditConfig;
use tether_core::{AuditError, CheckFailure, DatabaseName};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn};

use crate::catalog::{Catalog, ids};
use crate::executor::execute;
use crate::report::{AuditReport, CheckOutcome};
use crate::session::{SessionLease, SessionProvider};

/// Time and concurrency limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSettings {
    pub check_timeout: Duration,
    pub audit_timeout: Duration,
    pub max_concurrency: usize,
}

impl AuditSettings {
    #[must_use]
    pub const fn from_config(config: &AuditConfig) -> Self {
        Self {
            check_timeout: config.check_timeout(),
            audit_timeout: config.audit_timeout(),
            max_concurrency: config.max_concurrency,
        }
    }

    /// Number of checks allowed to run at once for a catalog of `checks`.
    #[must_use]
    pub fn concurrency_for(&self, checks: usize) -> usize {
        checks.min(self.max_concurrency).max(1)
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}

/// Runs the check catalog against databases handed out by a provider.
pub struct Auditor<P: SessionProvider> {
    provider: Arc<P>,
    catalog: Catalog,
    settings: AuditSettings,
}

impl<P: SessionProvider> Auditor<P> {
    pub const fn new(provider: Arc<P>, catalog: Catalog, settings: AuditSettings) -> Self {
        Self {
            provider,
            catalog,
            settings,
        }
    }

    /// An auditor over the built-in catalog with limits from `config`.
    pub fn from_config(provider: Arc<P>, config: &AuditConfig) -> Self {
        Self::new(provider, Catalog::builtin(), AuditSettings::from_config(config))
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    #[must_use]
    pub const fn settings(&self) -> &AuditSettings {
        &self.settings
    }

    /// Run every check against `database_name`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] for a blank or malformed name
    /// (before any session is requested), or whatever the provider reports
    /// when acquisition fails. Individual check failures never fail the run.
    pub async fn run_audit(&self, database_name: &str) -> Result<AuditReport, AuditError> {
        self.run_audit_until(database_name, std::future::pending()).await
    }

    /// Like [`Auditor::run_audit`], but stops early when `cancel` resolves.
    ///
    /// Checks still running at that point are aborted and reported as
    /// cancelled. The same happens when the run deadline expires.
    ///
    /// # Errors
    ///
    /// See [`Auditor::run_audit`].
    pub async fn run_audit_until<F>(
        &self,
        database_name: &str,
        cancel: F,
    ) -> Result<AuditReport, AuditError>
    where
        F: Future<Output = ()> + Send,
    {
        let name = DatabaseName::parse(database_name)?;
        let timestamp = Utc::now();
        info!(database = %name, checks = self.catalog.len(), "starting audit");

        let session = self.provider.acquire(&name).await.inspect_err(|error| {
            warn!(database = %name, %error, "could not acquire session");
        })?;
        let lease = SessionLease::new(Arc::clone(&self.provider), session);

        let outcomes = self.dispatch(&lease, cancel).await;
        lease.release();

        let report = AuditReport::assemble(name, timestamp, &self.catalog, outcomes);
        log_audit(&report);
        Ok(report)
    }

    async fn dispatch<F>(&self, lease: &SessionLease<P>, cancel: F) -> Vec<CheckOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        let checks = self.catalog.list_checks();
        let permits = Arc::new(Semaphore::new(
            self.settings.concurrency_for(checks.len()),
        ));
        let mut set = JoinSet::new();
        let mut task_checks = HashMap::with_capacity(checks.len());

        for check in checks.iter().copied() {
            let session = Arc::clone(lease.session());
            let permits = Arc::clone(&permits);
            let timeout = self.settings.check_timeout;
            let handle = set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return CheckOutcome::failed(check.id, CheckFailure::Cancelled, Duration::ZERO);
                };
                execute(&check, session.as_ref(), timeout).await
            });
            task_checks.insert(handle.id(), check.id);
        }

        let mut outcomes = Vec::with_capacity(checks.len());
        let deadline = tokio::time::sleep(self.settings.audit_timeout);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                joined = set.join_next_with_id() => match joined {
                    None => break,
                    Some(Ok((_, outcome))) => outcomes.push(outcome),
                    Some(Err(error)) => {
                        if let Some(check_id) = task_checks.get(&error.id()).copied() {
                            outcomes.push(CheckOutcome::failed(
                                check_id,
                                failure_from_join(error),
                                Duration::ZERO,
                            ));
                        }
                    }
                },
                () = &mut cancel => {
                    warn!(pending = set.len(), "audit cancelled");
                    set.shutdown().await;
                    break;
                }
                () = &mut deadline => {
                    warn!(
                        pending = set.len(),
                        timeout_secs = self.settings.audit_timeout.as_secs(),
                        "audit deadline expired"
                    );
                    set.shutdown().await;
                    break;
                }
            }
        }

        outcomes
    }
}

fn failure_from_join(error: JoinError) -> CheckFailure {
    if !error.is_panic() {
        return CheckFailure::Cancelled;
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    warn!(%message, "check task panicked");
    CheckFailure::Panicked(message)
}

fn log_audit(report: &AuditReport) {
    let summary = report.summary();
    let legacy_anomaly_rows =
        report.rows(ids::CONSTRAINT_ANOMALIES).len() + report.rows(ids::DATA_ANOMALIES).len();
    info!(
        target: "tether::audit_log",
        database = %report.database_name(),
        timestamp = %report.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true),
        rows_per_check = ?summary.rows_per_check,
        missing_constraints = summary.missing_constraints,
        total_anomalies = summary.total_anomalies,
        legacy_anomaly_rows,
        failed_checks = summary.failed_checks,
        "audit completed"
    );
}
