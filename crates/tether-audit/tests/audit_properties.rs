//! End-to-end behavior of the auditor over a scripted provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;
use tether_audit::catalog::{BUILTIN_CHECKS, ids};
use tether_audit::testing::ScriptedProvider;
use tether_audit::{AuditSettings, Auditor, Catalog, summary::summarize};
use tether_core::row::row_from;
use tether_core::{AuditError, CheckStatus, Row};

fn settings() -> AuditSettings {
    AuditSettings {
        check_timeout: Duration::from_secs(5),
        audit_timeout: Duration::from_secs(20),
        max_concurrency: 8,
    }
}

fn query_of(id: &str) -> &'static str {
    Catalog::builtin().get(id).map(|check| check.script.query).unwrap()
}

fn builtin_auditor(provider: &Arc<ScriptedProvider>) -> Auditor<ScriptedProvider> {
    Auditor::new(Arc::clone(provider), Catalog::builtin(), settings())
}

fn missing_constraint_row() -> Row {
    row_from([
        ("parent_table", json!("Orders")),
        ("parent_column", json!("CustomerId")),
        ("referenced_table", json!("Customer")),
        ("referenced_column", json!("id")),
        ("status", json!("Missing FK Constraint")),
    ])
}

#[tokio::test]
async fn report_has_one_entry_per_catalog_check() {
    let provider = Arc::new(ScriptedProvider::new());
    let report = builtin_auditor(&provider).run_audit("Sales").await.unwrap();

    let ids: Vec<&str> = report.results().iter().map(|r| r.check_id).collect();
    let expected: Vec<&str> = BUILTIN_CHECKS.iter().map(|c| c.id).collect();
    assert_eq!(ids, expected);

    let json = serde_json::to_value(&report).unwrap();
    for check in BUILTIN_CHECKS {
        assert!(json[check.report_key].is_array(), "{}", check.report_key);
    }
}

#[tokio::test]
async fn every_check_runs_exactly_once() {
    let provider = Arc::new(ScriptedProvider::new());
    builtin_auditor(&provider).run_audit("Sales").await.unwrap();

    let statements = provider.statements();
    for check in BUILTIN_CHECKS {
        let runs = statements.iter().filter(|sql| *sql == check.script.query).count();
        assert_eq!(runs, 1, "{}", check.id);
    }
}

#[tokio::test]
async fn summary_is_a_function_of_results() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_rows(query_of(ids::MISSING_CONSTRAINTS), vec![missing_constraint_row()])
            .with_rows(
                query_of(ids::ISOLATED_TABLES),
                vec![row_from([("TableName", json!("AuditLog"))])],
            ),
    );
    let report = builtin_auditor(&provider).run_audit("Sales").await.unwrap();

    assert_eq!(report.summary(), &report.recompute_summary());
    assert_eq!(report.summary(), &summarize(report.results()));
    assert_eq!(report.summary().missing_constraints, 1);
    assert_eq!(report.summary().isolated_tables, 1);
}

#[tokio::test]
async fn empty_name_is_rejected_before_acquiring() {
    let provider = Arc::new(ScriptedProvider::new());
    let err = builtin_auditor(&provider).run_audit("   ").await.unwrap_err();

    assert!(matches!(err, AuditError::InvalidInput(_)));
    assert_eq!(provider.acquired(), 0);
    assert!(provider.statements().is_empty());
}

#[tokio::test]
async fn malformed_name_is_rejected_before_acquiring() {
    let provider = Arc::new(ScriptedProvider::new());
    let err = builtin_auditor(&provider)
        .run_audit("Sales; DROP TABLE Orders")
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::InvalidInput(_)));
    assert_eq!(provider.acquired(), 0);
}

#[tokio::test]
async fn unknown_database_dispatches_nothing() {
    let provider = Arc::new(ScriptedProvider::new().with_databases(&["Sales"]));
    let err = builtin_auditor(&provider).run_audit("Nope").await.unwrap_err();

    assert!(matches!(err, AuditError::DatabaseNotFound(ref name) if name == "Nope"));
    assert!(provider.statements().is_empty());
    assert_eq!(provider.released(), 0);
}

#[tokio::test]
async fn unreachable_server_dispatches_nothing() {
    let provider = Arc::new(ScriptedProvider::new().unreachable());
    let err = builtin_auditor(&provider).run_audit("Sales").await.unwrap_err();

    assert!(matches!(err, AuditError::Connection(_)));
    assert!(provider.statements().is_empty());
}

#[tokio::test]
async fn one_failing_check_leaves_others_intact() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_error(query_of(ids::MISSING_CONSTRAINTS), "connection reset by peer")
            .with_rows(
                query_of(ids::NULLABLE_FOREIGN_KEYS),
                vec![row_from([
                    ("FK_Name", json!("OrderLine_fk_0")),
                    ("TableName", json!("OrderLine")),
                    ("ColumnName", json!("product_id")),
                ])],
            ),
    );
    let report = builtin_auditor(&provider).run_audit("Sales").await.unwrap();

    let missing = report.result(ids::MISSING_CONSTRAINTS).unwrap();
    assert_eq!(missing.status, CheckStatus::Failed);
    assert!(missing.rows.is_empty());
    assert_eq!(report.rows(ids::NULLABLE_FOREIGN_KEYS).len(), 1);
    assert_eq!(report.summary().failed_checks, 1);
    assert_eq!(report.summary().nullable_foreign_keys, 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["missingConstraints"], json!([]));
    assert_eq!(json["checks"]["missingConstraints"]["status"], json!("failed"));
}

#[tokio::test]
async fn normalization_scenario_over_partial_catalog() {
    let catalog = Catalog::new(vec![
        *Catalog::builtin().get(ids::MISSING_CONSTRAINTS).unwrap(),
        *Catalog::builtin().get(ids::NORMALIZATION).unwrap(),
    ])
    .unwrap();
    let provider = Arc::new(ScriptedProvider::new().with_rows(
        query_of(ids::NORMALIZATION),
        vec![
            row_from([("TableName", json!("Orders")), ("ColumnCount", json!(12))]),
            row_from([("TableName", json!("Customer")), ("ColumnCount", json!(4))]),
        ],
    ));
    let auditor = Auditor::new(Arc::clone(&provider), catalog, settings());

    let report = auditor.run_audit("Sales").await.unwrap();

    let statuses: Vec<_> = report
        .rows(ids::NORMALIZATION)
        .iter()
        .map(|row| row["NormalizationStatus"].clone())
        .collect();
    assert_eq!(statuses, [json!("Needs Normalization"), json!("Normalized")]);
    assert_eq!(report.summary().normalization_issues, 1);
    assert_eq!(report.results().len(), 2);
}

#[tokio::test]
async fn session_is_released_once_after_success() {
    let provider = Arc::new(ScriptedProvider::new());
    builtin_auditor(&provider).run_audit("Sales").await.unwrap();

    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn cancellation_keeps_completed_checks_and_releases_once() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_rows(query_of(ids::MISSING_CONSTRAINTS), vec![missing_constraint_row()])
            .with_delay(query_of(ids::CONSISTENCY), Duration::from_secs(30), vec![]),
    );
    let auditor = builtin_auditor(&provider);

    let report = auditor
        .run_audit_until("Sales", tokio::time::sleep(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(report.rows(ids::MISSING_CONSTRAINTS).len(), 1);
    let consistency = report.result(ids::CONSISTENCY).unwrap();
    assert_eq!(consistency.status, CheckStatus::Cancelled);
    assert!(consistency.rows.is_empty());
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn dropping_a_running_audit_still_releases_the_session() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_delay(query_of(ids::CONSISTENCY), Duration::from_secs(30), vec![]),
    );
    let auditor = builtin_auditor(&provider);

    let run = auditor.run_audit("Sales");
    let abandoned = tokio::time::timeout(Duration::from_millis(100), run).await;

    assert!(abandoned.is_err());
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn slow_check_times_out_without_failing_the_run() {
    let provider = Arc::new(ScriptedProvider::new().with_delay(
        query_of(ids::NORMALIZATION),
        Duration::from_secs(30),
        vec![],
    ));
    let auditor = Auditor::new(
        Arc::clone(&provider),
        Catalog::builtin(),
        AuditSettings {
            check_timeout: Duration::from_millis(50),
            ..settings()
        },
    );

    let report = auditor.run_audit("Sales").await.unwrap();

    let normalization = report.result(ids::NORMALIZATION).unwrap();
    assert_eq!(normalization.status, CheckStatus::TimedOut);
    assert_eq!(report.summary().failed_checks, 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn concurrency_stays_within_bound() {
    let mut provider = ScriptedProvider::new();
    for check in BUILTIN_CHECKS {
        provider = provider.with_delay(check.script.query, Duration::from_millis(40), vec![]);
    }
    let provider = Arc::new(provider);
    let auditor = Auditor::new(
        Arc::clone(&provider),
        Catalog::builtin(),
        AuditSettings {
            max_concurrency: 2,
            ..settings()
        },
    );

    let report = auditor.run_audit("Sales").await.unwrap();

    assert_eq!(report.summary().failed_checks, 0);
    assert!(provider.peak_in_flight() <= 2, "peak {}", provider.peak_in_flight());
}

#[tokio::test]
async fn checks_run_concurrently() {
    let delay = Duration::from_millis(200);
    let mut provider = ScriptedProvider::new();
    for check in BUILTIN_CHECKS {
        provider = provider.with_delay(check.script.query, delay, vec![]);
    }
    let provider = Arc::new(provider);

    let started = Instant::now();
    let report = builtin_auditor(&provider).run_audit("Sales").await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.summary().failed_checks, 0);
    assert_eq!(provider.peak_in_flight(), BUILTIN_CHECKS.len());
    let sequential = delay * u32::try_from(BUILTIN_CHECKS.len()).unwrap();
    assert!(elapsed < sequential / 2, "took {elapsed:?}");
}

#[tokio::test]
async fn scratch_table_is_dropped_even_when_query_fails() {
    let check = *Catalog::builtin().get(ids::CONSISTENCY).unwrap();
    let provider = Arc::new(ScriptedProvider::new().with_error(check.script.query, "locked"));
    builtin_auditor(&provider).run_audit("Sales").await.unwrap();

    let statements = provider.statements();
    let teardown = check.script.teardown[0];
    assert!(statements.iter().any(|sql| sql == teardown));
}
