//! HTTP transport configuration.

use serde::{Deserialize, Serialize};

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

const fn default_workers() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the audit endpoint listens on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Value sent in `Access-Control-Allow-Origin`. Empty disables CORS headers.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Number of blocking request-handling threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origin: default_allowed_origin(),
            workers: default_workers(),
        }
    }
}

impl ServerConfig {
    /// Whether CORS headers should be attached to responses.
    #[must_use]
    pub fn cors_enabled(&self) -> bool {
        !self.allowed_origin.is_empty()
    }
}
