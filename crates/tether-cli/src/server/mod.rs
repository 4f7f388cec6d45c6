//! HTTP transport for audits.
//!
//! `tiny_http` receives requests on a fixed pool of blocking threads. Each
//! thread hands the request to [`routes::handle`] on the tokio runtime and
//! writes the response back.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tether_config::TetherConfig;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bootstrap;

pub mod response;
pub mod routes;

use response::ApiResponse;
pub use routes::AppState;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Serve until interrupted.
pub async fn serve(config: &TetherConfig) -> anyhow::Result<()> {
    let bind = config.server.bind.as_str();
    let server = tiny_http::Server::http(bind)
        .map(Arc::new)
        .map_err(|error| anyhow::anyhow!("failed to bind {bind}: {error}"))?;
    let state = Arc::new(AppState::from_config(config));
    let stopping = Arc::new(AtomicBool::new(false));
    let workers = config.server.workers;

    info!(
        %bind,
        workers,
        data_dir = %config.database.data_dir.display(),
        "tether audit server listening"
    );

    let mut pool = JoinSet::new();
    for _ in 0..workers {
        let server = Arc::clone(&server);
        let state = Arc::clone(&state);
        let stopping = Arc::clone(&stopping);
        let handle = Handle::current();
        pool.spawn_blocking(move || accept_loop(&server, &state, &stopping, &handle));
    }

    bootstrap::interrupted().await;
    info!("shutting down");
    stopping.store(true, Ordering::SeqCst);
    for _ in 0..workers {
        server.unblock();
    }

    while let Some(joined) = pool.join_next().await {
        joined.context("request worker panicked")?;
    }
    Ok(())
}

fn accept_loop(
    server: &tiny_http::Server,
    state: &AppState,
    stopping: &AtomicBool,
    handle: &Handle,
) {
    loop {
        let mut request = match server.recv() {
            Ok(request) => request,
            Err(error) => {
                if stopping.load(Ordering::SeqCst) {
                    debug!("request worker stopped");
                    return;
                }
                warn!(%error, "failed to receive request");
                continue;
            }
        };

        let method = request.method().to_string();
        let url = request.url().to_string();

        let response = match read_body(request.as_reader()) {
            Ok(body) => handle.block_on(routes::handle(state, &method, &url, &body)),
            Err(response) => response,
        };
        debug!(%method, %url, status = response.status, "request handled");

        if let Err(error) = request.respond(response.into_http(state.allowed_origin())) {
            warn!(%error, "failed to send response");
        }
    }
}

/// Read a UTF-8 body of at most [`MAX_BODY_BYTES`].
fn read_body(reader: impl Read) -> Result<String, ApiResponse> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|error| {
            ApiResponse::error(400, "Unreadable request body", Some(error.to_string()))
        })?;
    if bytes.len() > MAX_BODY_BYTES {
        return Err(ApiResponse::error(413, "Request body too large", None));
    }
    String::from_utf8(bytes).map_err(|error| {
        ApiResponse::error(400, "Unreadable request body", Some(error.to_string()))
    })
}
