//! The check catalog.
//!
//! A [`Check`] is one named introspection script plus the row shape it
//! produces. The catalog is an ordered, immutable list of checks; adding a
//! check means appending an entry to [`BUILTIN_CHECKS`] and nothing else.
//!
//! Scripts target the SQLite dialect spoken by libSQL sessions.

use serde_json::Value;
use tether_core::AuditError;
use tether_core::row::{Row, int_field};

/// Tables with more columns than this are flagged for normalization.
pub const NORMALIZATION_THRESHOLD: i64 = 10;

/// Check identifiers of the built-in catalog.
pub mod ids {
    pub const MISSING_CONSTRAINTS: &str = "missing_constraints";
    pub const CONSTRAINT_ANOMALIES: &str = "constraint_anomalies";
    pub const DATA_ANOMALIES: &str = "data_anomalies";
    pub const ISOLATED_TABLES: &str = "isolated_tables";
    pub const NORMALIZATION: &str = "normalization";
    pub const CONSISTENCY: &str = "consistency";
    pub const TRIGGER_ANOMALIES: &str = "trigger_anomalies";
    pub const NULLABLE_FOREIGN_KEYS: &str = "nullable_foreign_keys";
}

/// Statements a check runs on its own connection.
///
/// `setup` runs first, then `query` produces the rows, then `teardown`
/// runs whether or not the earlier steps succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckScript {
    pub setup: &'static [&'static str],
    pub query: &'static str,
    pub teardown: &'static [&'static str],
}

impl CheckScript {
    /// A script made of a single read-only query.
    #[must_use]
    pub const fn query(query: &'static str) -> Self {
        Self {
            setup: &[],
            query,
            teardown: &[],
        }
    }

    /// A script that stages results in scratch objects it must clean up.
    #[must_use]
    pub const fn staged(
        setup: &'static [&'static str],
        query: &'static str,
        teardown: &'static [&'static str],
    ) -> Self {
        Self {
            setup,
            query,
            teardown,
        }
    }
}

/// One named schema check.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    /// Stable identifier, e.g. `missing_constraints`.
    pub id: &'static str,
    /// Human-readable label.
    pub description: &'static str,
    /// Key under which the rows appear in the serialized report.
    pub report_key: &'static str,
    /// Columns each row carries once classified.
    pub columns: &'static [&'static str],
    pub script: CheckScript,
    /// Optional pure post-processing applied to every row.
    pub classify: Option<fn(&mut Row)>,
}

/// The built-in checks, in report order.
pub const BUILTIN_CHECKS: &[Check] = &[
    Check {
        id: ids::MISSING_CONSTRAINTS,
        description: "Relationships that look like foreign keys but have no constraint",
        report_key: "missingConstraints",
        columns: &[
            "parent_table",
            "parent_column",
            "referenced_table",
            "referenced_column",
            "status",
        ],
        script: CheckScript::query(include_str!("../sql/missing_constraints.sql")),
        classify: None,
    },
    Check {
        id: ids::CONSTRAINT_ANOMALIES,
        description: "Foreign keys that are disabled or not trusted",
        report_key: "constraintAnomalies",
        columns: &[
            "TableName",
            "FKName",
            "DeleteBehavior",
            "UpdateBehavior",
            "Status",
            "TrustStatus",
        ],
        script: CheckScript::query(include_str!("../sql/constraint_anomalies.sql")),
        classify: None,
    },
    Check {
        id: ids::DATA_ANOMALIES,
        description: "Foreign-key columns with disabled or untrusted constraint counts",
        report_key: "dataAnomalies",
        columns: &[
            "parent_table",
            "referenced_table",
            "parent_column",
            "referenced_column",
            "fk_name",
            "disabled_constraints",
            "untrusted_constraints",
        ],
        script: CheckScript::query(include_str!("../sql/data_anomalies.sql")),
        classify: None,
    },
    Check {
        id: ids::ISOLATED_TABLES,
        description: "Tables with no foreign keys in either direction",
        report_key: "isolatedTables",
        columns: &["TableName", "TriggerName", "TriggerDisabled"],
        script: CheckScript::query(include_str!("../sql/isolated_tables.sql")),
        classify: None,
    },
    Check {
        id: ids::NORMALIZATION,
        description: "Tables whose column count suggests they need normalization",
        report_key: "normalizationStatus",
        columns: &["TableName", "ColumnCount", "NormalizationStatus"],
        script: CheckScript::query(include_str!("../sql/normalization.sql")),
        classify: Some(classify_normalization),
    },
    Check {
        id: ids::CONSISTENCY,
        description: "Engine consistency scan of constraints and storage",
        report_key: "dbccAnomalies",
        columns: &[
            "TableName",
            "ConstraintName",
            "ErrorType",
            "ErrorDescription",
            "Status",
            "Severity",
            "AlertType",
        ],
        script: CheckScript::staged(
            &[include_str!("../sql/consistency_setup.sql")],
            include_str!("../sql/consistency.sql"),
            &[include_str!("../sql/consistency_teardown.sql")],
        ),
        classify: None,
    },
    Check {
        id: ids::TRIGGER_ANOMALIES,
        description: "Triggers and their enabled state",
        report_key: "triggerAnomalies",
        columns: &["TableName", "TriggerName", "TriggerDisabled", "TriggerStatus"],
        script: CheckScript::query(include_str!("../sql/trigger_anomalies.sql")),
        classify: None,
    },
    Check {
        id: ids::NULLABLE_FOREIGN_KEYS,
        description: "Foreign-key columns that accept NULL",
        report_key: "nullableFKs",
        columns: &["FK_Name", "TableName", "ColumnName"],
        script: CheckScript::query(include_str!("../sql/nullable_foreign_keys.sql")),
        classify: None,
    },
];

/// Whether a normalization row's column count exceeds the threshold.
#[must_use]
pub fn needs_normalization(row: &Row) -> bool {
    int_field(row, "ColumnCount").is_some_and(|count| count > NORMALIZATION_THRESHOLD)
}

fn classify_normalization(row: &mut Row) {
    let status = if needs_normalization(row) {
        "Needs Normalization"
    } else {
        "Normalized"
    };
    row.insert(
        "NormalizationStatus".to_string(),
        Value::String(status.to_string()),
    );
}

/// Top-level report fields a check's report key may not shadow.
pub const RESERVED_REPORT_KEYS: &[&str] = &["databaseName", "timestamp", "summary", "checks"];

/// An ordered, immutable set of checks with unique ids and report keys.
#[derive(Debug, Clone)]
pub struct Catalog {
    checks: Vec<Check>,
}

impl Catalog {
    /// Build a catalog from explicit checks.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidCatalog`] if the list is empty, two
    /// checks share an id or a report key, or a report key collides with a
    /// [reserved](RESERVED_REPORT_KEYS) report field.
    pub fn new(checks: Vec<Check>) -> Result<Self, AuditError> {
        if checks.is_empty() {
            return Err(AuditError::InvalidCatalog("catalog has no checks".into()));
        }
        for (index, check) in checks.iter().enumerate() {
            if RESERVED_REPORT_KEYS.contains(&check.report_key) {
                return Err(AuditError::InvalidCatalog(format!(
                    "report key '{}' is reserved",
                    check.report_key
                )));
            }
            for earlier in &checks[..index] {
                if earlier.id == check.id {
                    return Err(AuditError::InvalidCatalog(format!(
                        "duplicate check id '{}'",
                        check.id
                    )));
                }
                if earlier.report_key == check.report_key {
                    return Err(AuditError::InvalidCatalog(format!(
                        "duplicate report key '{}'",
                        check.report_key
                    )));
                }
            }
        }
        Ok(Self { checks })
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            checks: BUILTIN_CHECKS.to_vec(),
        }
    }

    /// All checks in report order.
    #[must_use]
    pub fn list_checks(&self) -> &[Check] {
        &self.checks
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|check| check.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
