use anyhow::Context;
use serde::Serialize;
use tether_audit::AuditReport;
use tether_config::TetherConfig;

use crate::bootstrap;
use crate::cli::{GlobalFlags, OutputFormat, RunArgs};
use crate::output::output;

/// One line of the table view of a report.
#[derive(Debug, Serialize)]
struct CheckLine<'a> {
    check: &'a str,
    status: &'a str,
    rows: usize,
    error: &'a str,
}

/// Handle `tether run <database>`.
pub async fn handle(
    args: &RunArgs,
    config: &TetherConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let auditor = bootstrap::auditor(config);
    let report = auditor
        .run_audit_until(&args.database, bootstrap::interrupted())
        .await
        .with_context(|| format!("audit of '{}' failed", args.database))?;

    if args.summary_only {
        return output(report.summary(), flags.format);
    }

    match flags.format {
        OutputFormat::Table => {
            output(&check_lines(&report), flags.format)?;
            println!();
            output(report.summary(), flags.format)
        }
        OutputFormat::Json | OutputFormat::Raw => output(&report, flags.format),
    }
}

fn check_lines(report: &AuditReport) -> Vec<CheckLine<'_>> {
    report
        .results()
        .iter()
        .map(|result| CheckLine {
            check: result.report_key,
            status: result.status.as_str(),
            rows: result.rows.len(),
            error: result.error.as_deref().unwrap_or(""),
        })
        .collect()
}
