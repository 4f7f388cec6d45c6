//! Request routing.
//!
//! | Method | Path              | Response                               |
//! |--------|-------------------|----------------------------------------|
//! | GET    | `/`               | health text                            |
//! | GET    | `/databases`      | available database names               |
//! | GET    | `/checks`         | the check catalog                      |
//! | POST   | `/database-audit` | audit report for `{ "databaseName" }`  |
//! | OPTIONS| any               | CORS preflight                         |

use serde::Deserialize;
use tether_audit::Auditor;
use tether_config::TetherConfig;
use tether_core::AuditError;
use tether_db::LibsqlProvider;
use tracing::{error, warn};

use super::response::ApiResponse;
use crate::bootstrap;
use crate::commands::checks;

/// Shared, read-only state for every request.
pub struct AppState {
    auditor: Auditor<LibsqlProvider>,
    allowed_origin: Option<String>,
}

impl AppState {
    #[must_use]
    pub fn from_config(config: &TetherConfig) -> Self {
        Self {
            auditor: bootstrap::auditor(config),
            allowed_origin: config
                .server
                .cors_enabled()
                .then(|| config.server.allowed_origin.clone()),
        }
    }

    #[must_use]
    pub fn allowed_origin(&self) -> Option<&str> {
        self.allowed_origin.as_deref()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditRequest {
    #[serde(default)]
    database_name: Option<String>,
}

/// Produce the response for one request.
pub async fn handle(state: &AppState, method: &str, url: &str, body: &str) -> ApiResponse {
    let path = url.split_once('?').map_or(url, |(path, _)| path);

    match (method, path) {
        ("OPTIONS", _) => ApiResponse::no_content(),
        ("GET", "/") => ApiResponse::text(200, "Tether audit server is running"),
        ("GET", "/databases") => list_databases(state).await,
        ("GET", "/checks") => list_checks(state),
        ("POST", "/database-audit") => audit(state, body).await,
        (_, "/" | "/databases" | "/checks" | "/database-audit") => {
            ApiResponse::error(405, "Method not allowed", Some(format!("{method} {path}")))
        }
        _ => ApiResponse::error(404, "Not found", Some(path.to_string())),
    }
}

async fn list_databases(state: &AppState) -> ApiResponse {
    match state.auditor.provider().list_databases().await {
        Ok(names) => ApiResponse::json(200, serde_json::json!(names)),
        Err(err) => {
            error!(%err, "failed to list databases");
            ApiResponse::error(500, "Could not list databases", Some(err.to_string()))
        }
    }
}

fn list_checks(state: &AppState) -> ApiResponse {
    match serde_json::to_value(checks::describe(state.auditor.catalog())) {
        Ok(value) => ApiResponse::json(200, value),
        Err(err) => ApiResponse::error(500, "Could not describe checks", Some(err.to_string())),
    }
}

async fn audit(state: &AppState, body: &str) -> ApiResponse {
    let request: AuditRequest = if body.trim().is_empty() {
        AuditRequest::default()
    } else {
        match serde_json::from_str(body) {
            Ok(request) => request,
            Err(err) => {
                return ApiResponse::error(400, "Invalid request body", Some(err.to_string()));
            }
        }
    };

    let Some(name) = request.database_name.filter(|name| !name.trim().is_empty()) else {
        return ApiResponse::error(400, "Database name is required", None);
    };

    match state.auditor.run_audit(&name).await {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(value) => ApiResponse::json(200, value),
            Err(err) => {
                error!(%err, "failed to serialize report");
                ApiResponse::error(500, "Database audit failed", Some(err.to_string()))
            }
        },
        Err(err) => audit_error(&err),
    }
}

fn audit_error(err: &AuditError) -> ApiResponse {
    if !err.is_client_error() {
        warn!(%err, "audit could not start");
    }
    let details = Some(err.to_string());
    if matches!(err, AuditError::InvalidInput(_)) {
        ApiResponse::error(400, "Invalid database name", details)
    } else {
        ApiResponse::error(500, "Database audit failed", details)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;
    use crate::server::response::Body;

    async fn state() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let db = libsql::Builder::new_local(dir.path().join("Shop.db"))
            .build()
            .await
            .unwrap();
        db.connect()
            .unwrap()
            .execute_batch(
                "CREATE TABLE Customer (id INTEGER PRIMARY KEY, name TEXT);
                 CREATE TABLE Orders (id INTEGER PRIMARY KEY, CustomerId INTEGER);",
            )
            .await
            .unwrap();

        let mut config = TetherConfig::default();
        config.database.data_dir = dir.path().to_path_buf();
        (dir, AppState::from_config(&config))
    }

    fn json_body(response: &ApiResponse) -> &Value {
        match &response.body {
            Body::Json(value) => value,
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_answers_text() {
        let (_dir, state) = state().await;
        let response = handle(&state, "GET", "/", "").await;
        assert_eq!(response.status, 200);
        assert!(matches!(response.body, Body::Text(_)));
    }

    #[tokio::test]
    async fn preflight_is_accepted_anywhere() {
        let (_dir, state) = state().await;
        let response = handle(&state, "OPTIONS", "/database-audit", "").await;
        assert_eq!(response, ApiResponse::no_content());
        assert_eq!(state.allowed_origin(), Some("http://localhost:5173"));
    }

    #[tokio::test]
    async fn audit_returns_report() {
        let (_dir, state) = state().await;
        let response = handle(
            &state,
            "POST",
            "/database-audit",
            r#"{"databaseName":"Shop"}"#,
        )
        .await;

        assert_eq!(response.status, 200);
        let body = json_body(&response);
        assert_eq!(body["databaseName"], json!("Shop"));
        assert_eq!(body["missingConstraints"][0]["parent_column"], json!("CustomerId"));
        assert!(body["timestamp"].is_string());
        assert_eq!(body["summary"]["missingConstraints"], json!(1));
    }

    #[tokio::test]
    async fn missing_name_is_bad_request() {
        let (_dir, state) = state().await;
        for body in ["", "{}", r#"{"databaseName":""}"#, r#"{"databaseName":"  "}"#] {
            let response = handle(&state, "POST", "/database-audit", body).await;
            assert_eq!(response.status, 400, "{body}");
            assert_eq!(json_body(&response)["error"], json!("Database name is required"));
        }
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (_dir, state) = state().await;
        let response = handle(&state, "POST", "/database-audit", "{not json").await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn unsafe_name_is_bad_request() {
        let (_dir, state) = state().await;
        let response = handle(
            &state,
            "POST",
            "/database-audit",
            r#"{"databaseName":"../etc/passwd"}"#,
        )
        .await;
        assert_eq!(response.status, 400);
        assert_eq!(json_body(&response)["error"], json!("Invalid database name"));
    }

    #[tokio::test]
    async fn unknown_database_fails_provisioning() {
        let (_dir, state) = state().await;
        let response = handle(
            &state,
            "POST",
            "/database-audit",
            r#"{"databaseName":"Nope"}"#,
        )
        .await;
        assert_eq!(response.status, 500);
        assert_eq!(
            json_body(&response),
            &json!({
                "error": "Database audit failed",
                "details": "Database 'Nope' does not exist",
            })
        );
    }

    #[tokio::test]
    async fn lists_databases() {
        let (_dir, state) = state().await;
        let response = handle(&state, "GET", "/databases?fresh=1", "").await;
        assert_eq!(response.status, 200);
        assert_eq!(json_body(&response), &json!(["Shop"]));
    }

    #[tokio::test]
    async fn lists_checks() {
        let (_dir, state) = state().await;
        let response = handle(&state, "GET", "/checks", "").await;
        assert_eq!(json_body(&response).as_array().map(Vec::len), Some(8));
    }

    #[tokio::test]
    async fn wrong_method_and_unknown_path() {
        let (_dir, state) = state().await;
        assert_eq!(handle(&state, "GET", "/database-audit", "").await.status, 405);
        assert_eq!(handle(&state, "GET", "/auditoria", "").await.status, 404);
    }

    #[test]
    fn connection_failures_map_to_server_error() {
        let response = audit_error(&AuditError::Connection("refused".into()));
        assert_eq!(response.status, 500);
        assert_eq!(json_body(&response)["error"], json!("Database audit failed"));
    }
}
