//! Derived summary counts.
//!
//! [`summarize`] is a pure function of the per-check results: the same
//! results always produce the same summary, and nothing else feeds into it.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_core::Row;
use tether_core::row::{int_field, is_truthy, text_field};

use crate::catalog::{ids, needs_normalization};
use crate::report::CheckResult;

/// Counts derived from an audit run's results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    /// Row count per report key, for every check in the catalog.
    pub rows_per_check: BTreeMap<String, usize>,
    pub missing_constraints: usize,
    /// Foreign keys that are disabled or not trusted.
    pub constraint_anomalies: usize,
    pub disabled_constraints: u64,
    pub untrusted_constraints: u64,
    /// Distinct isolated tables (a table with several triggers counts once).
    pub isolated_tables: usize,
    pub normalization_issues: usize,
    pub consistency_errors: usize,
    pub consistency_by_severity: BTreeMap<String, usize>,
    pub disabled_triggers: usize,
    pub nullable_foreign_keys: usize,
    /// Sum of every flagged category above.
    pub total_anomalies: usize,
    /// Checks that did not complete successfully.
    pub failed_checks: usize,
}

/// Compute summary counts from per-check results.
#[must_use]
pub fn summarize(results: &[CheckResult]) -> AuditSummary {
    let rows = |id: &str| rows_for(results, id);

    let missing_constraints = rows(ids::MISSING_CONSTRAINTS).len();

    let constraint_anomalies = rows(ids::CONSTRAINT_ANOMALIES)
        .iter()
        .filter(|row| {
            text_field(row, "Status").is_some_and(|s| s.eq_ignore_ascii_case("disabled"))
                || text_field(row, "TrustStatus")
                    .is_some_and(|s| s.eq_ignore_ascii_case("not trusted"))
        })
        .count();

    let data_anomalies = rows(ids::DATA_ANOMALIES);
    let disabled_constraints = sum_flags(data_anomalies, "disabled_constraints");
    let untrusted_constraints = sum_flags(data_anomalies, "untrusted_constraints");

    let mut isolated: Vec<&str> = rows(ids::ISOLATED_TABLES)
        .iter()
        .filter_map(|row| text_field(row, "TableName"))
        .collect();
    isolated.sort_unstable();
    isolated.dedup();
    let isolated_tables = isolated.len();

    let normalization_issues = rows(ids::NORMALIZATION)
        .iter()
        .filter(|row| needs_normalization(row))
        .count();

    let consistency = rows(ids::CONSISTENCY);
    let mut consistency_by_severity = BTreeMap::new();
    for row in consistency {
        let severity = text_field(row, "Severity").unwrap_or("Unknown");
        *consistency_by_severity
            .entry(severity.to_string())
            .or_insert(0) += 1;
    }

    let disabled_triggers = rows(ids::TRIGGER_ANOMALIES)
        .iter()
        .filter(|row| {
            is_truthy(row, "TriggerDisabled")
                || text_field(row, "TriggerStatus")
                    .is_some_and(|s| s.eq_ignore_ascii_case("disabled"))
        })
        .count();

    let nullable_foreign_keys = rows(ids::NULLABLE_FOREIGN_KEYS).len();

    let rows_per_check = results
        .iter()
        .map(|result| (result.report_key.to_string(), result.rows.len()))
        .collect();

    let failed_checks = results
        .iter()
        .filter(|result| !result.status.is_ok())
        .count();

    AuditSummary {
        rows_per_check,
        missing_constraints,
        constraint_anomalies,
        disabled_constraints,
        untrusted_constraints,
        isolated_tables,
        normalization_issues,
        consistency_errors: consistency.len(),
        consistency_by_severity,
        disabled_triggers,
        nullable_foreign_keys,
        total_anomalies: missing_constraints
            + constraint_anomalies
            + isolated_tables
            + normalization_issues
            + consistency.len()
            + disabled_triggers
            + nullable_foreign_keys,
        failed_checks,
    }
}

fn rows_for<'a>(results: &'a [CheckResult], id: &str) -> &'a [Row] {
    results
        .iter()
        .find(|result| result.check_id == id)
        .map_or(&[], |result| result.rows.as_slice())
}

fn sum_flags(rows: &[Row], key: &str) -> u64 {
    rows.iter()
        .filter_map(|row| int_field(row, key))
        .map(|n| u64::try_from(n).unwrap_or(0))
        .sum()
}
