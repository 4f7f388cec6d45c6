//! Check outcomes and the aggregate audit report.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tether_core::{CheckFailure, CheckStatus, DatabaseName, Row};

use crate::catalog::Catalog;
use crate::summary::{AuditSummary, summarize};

/// What one check produced during one run.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub check_id: &'static str,
    /// Rows in query order; always empty when the check failed.
    pub rows: Vec<Row>,
    pub failure: Option<CheckFailure>,
    pub elapsed: Duration,
}

impl CheckOutcome {
    #[must_use]
    pub const fn succeeded(check_id: &'static str, rows: Vec<Row>, elapsed: Duration) -> Self {
        Self {
            check_id,
            rows,
            failure: None,
            elapsed,
        }
    }

    #[must_use]
    pub const fn failed(check_id: &'static str, failure: CheckFailure, elapsed: Duration) -> Self {
        Self {
            check_id,
            rows: Vec::new(),
            failure: Some(failure),
            elapsed,
        }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }

    #[must_use]
    pub fn status(&self) -> CheckStatus {
        self.failure.as_ref().map_or(CheckStatus::Ok, CheckFailure::status)
    }
}

/// A check's entry in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub check_id: &'static str,
    pub report_key: &'static str,
    pub rows: Vec<Row>,
    pub status: CheckStatus,
    pub error: Option<String>,
}

/// The aggregate of one audit run.
///
/// Holds exactly one [`CheckResult`] per catalog check, in catalog order.
/// The summary is derived from the results when the report is assembled.
#[derive(Debug, Clone)]
pub struct AuditReport {
    database_name: DatabaseName,
    timestamp: DateTime<Utc>,
    results: Vec<CheckResult>,
    summary: AuditSummary,
}

impl AuditReport {
    /// Assemble a report from whatever outcomes were collected.
    ///
    /// Every catalog check gets an entry; a check with no outcome is recorded
    /// as cancelled. Outcomes for ids outside the catalog are ignored.
    #[must_use]
    pub fn assemble(
        database_name: DatabaseName,
        timestamp: DateTime<Utc>,
        catalog: &Catalog,
        mut outcomes: Vec<CheckOutcome>,
    ) -> Self {
        let results: Vec<CheckResult> = catalog
            .list_checks()
            .iter()
            .map(|check| {
                let outcome = outcomes
                    .iter()
                    .position(|outcome| outcome.check_id == check.id)
                    .map(|index| outcomes.swap_remove(index))
                    .unwrap_or_else(|| {
                        CheckOutcome::failed(check.id, CheckFailure::Cancelled, Duration::ZERO)
                    });
                CheckResult {
                    check_id: check.id,
                    report_key: check.report_key,
                    status: outcome.status(),
                    error: outcome.error_message(),
                    rows: outcome.rows,
                }
            })
            .collect();
        let summary = summarize(&results);

        Self {
            database_name,
            timestamp,
            results,
            summary,
        }
    }

    #[must_use]
    pub const fn database_name(&self) -> &DatabaseName {
        &self.database_name
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Results in catalog order.
    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    #[must_use]
    pub fn result(&self, check_id: &str) -> Option<&CheckResult> {
        self.results.iter().find(|result| result.check_id == check_id)
    }

    /// Rows for a check id; empty when the check failed or is unknown.
    #[must_use]
    pub fn rows(&self, check_id: &str) -> &[Row] {
        self.result(check_id).map_or(&[], |result| result.rows.as_slice())
    }

    #[must_use]
    pub const fn summary(&self) -> &AuditSummary {
        &self.summary
    }

    /// Recompute the summary from the stored results.
    #[must_use]
    pub fn recompute_summary(&self) -> AuditSummary {
        summarize(&self.results)
    }

    /// Results of checks that did not complete.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|result| !result.status.is_ok())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckStatusEntry<'a> {
    status: CheckStatus,
    row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

struct CheckStatuses<'a>(&'a [CheckResult]);

impl Serialize for CheckStatuses<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(
                result.report_key,
                &CheckStatusEntry {
                    status: result.status,
                    row_count: result.rows.len(),
                    error: result.error.as_deref(),
                },
            )?;
        }
        map.end()
    }
}

/// Wire shape: one key per check (its report key) holding the rows, plus
/// `databaseName`, `timestamp`, `summary` and a `checks` status map.
impl Serialize for AuditReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.results.len() + 4))?;
        map.serialize_entry("databaseName", &self.database_name)?;
        for result in &self.results {
            map.serialize_entry(result.report_key, &result.rows)?;
        }
        map.serialize_entry(
            "timestamp",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.serialize_entry("summary", &self.summary)?;
        map.serialize_entry("checks", &CheckStatuses(&self.results))?;
        map.end()
    }
}
