//! Single-check execution.
//!
//! [`execute`] runs one check on its own connection and always returns a
//! [`CheckOutcome`]: query errors, teardown errors and timeouts are logged
//! and folded into a failed outcome so one bad check cannot abort a run.

use std::time::{Duration, Instant};

use tether_core::{CheckFailure, Row, SessionError};
use tracing::{debug, warn};

use crate::catalog::{Check, CheckScript};
use crate::report::CheckOutcome;
use crate::session::{DbSession, SessionConnection};

/// Run `check` against `session`, bounded by `timeout`.
///
/// Scratch objects created by a staged script live on the check's own
/// connection. On a timeout the connection is dropped with the check's
/// future, which discards them.
pub async fn execute<S: DbSession>(check: &Check, session: &S, timeout: Duration) -> CheckOutcome {
    let started = Instant::now();
    debug!(check = check.id, database = %session.database_name(), "check started");

    let result = tokio::time::timeout(timeout, run_check(check, session)).await;
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(mut rows)) => {
            if let Some(classify) = check.classify {
                rows.iter_mut().for_each(classify);
            }
            debug!(
                check = check.id,
                rows = rows.len(),
                elapsed_ms = elapsed.as_millis(),
                "check finished"
            );
            CheckOutcome::succeeded(check.id, rows, elapsed)
        }
        Ok(Err(error)) => {
            warn!(check = check.id, %error, "check failed");
            CheckOutcome::failed(check.id, CheckFailure::Query(error.to_string()), elapsed)
        }
        Err(_) => {
            warn!(check = check.id, timeout_ms = timeout.as_millis(), "check timed out");
            CheckOutcome::failed(check.id, CheckFailure::TimedOut { after: timeout }, elapsed)
        }
    }
}

async fn run_check<S: DbSession>(check: &Check, session: &S) -> Result<Vec<Row>, SessionError> {
    let conn = session.connect().await?;
    run_script(&conn, &check.script).await
}

/// Run setup and query, then teardown regardless of how they went.
///
/// A teardown failure fails the check even when the query succeeded, since
/// the scratch state was not undone.
async fn run_script<C: SessionConnection>(
    conn: &C,
    script: &CheckScript,
) -> Result<Vec<Row>, SessionError> {
    let body = run_body(conn, script).await;

    let mut teardown = Ok(());
    for statement in script.teardown {
        if let Err(error) = conn.execute_batch(statement).await {
            teardown = Err(error);
        }
    }

    let rows = body?;
    teardown?;
    Ok(rows)
}

async fn run_body<C: SessionConnection>(
    conn: &C,
    script: &CheckScript,
) -> Result<Vec<Row>, SessionError> {
    for statement in script.setup {
        conn.execute_batch(statement).await?;
    }
    conn.query(script.query).await
}
