//! Response values independent of the HTTP library.

use std::io::Cursor;

use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    #[must_use]
    pub const fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: Body::Json(value),
        }
    }

    #[must_use]
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: Body::Text(text.into()),
        }
    }

    #[must_use]
    pub const fn no_content() -> Self {
        Self {
            status: 204,
            body: Body::Empty,
        }
    }

    /// An `{ error, details? }` body.
    #[must_use]
    pub fn error(status: u16, error: &str, details: Option<String>) -> Self {
        let value = match details {
            Some(details) => json!({ "error": error, "details": details }),
            None => json!({ "error": error }),
        };
        Self::json(status, value)
    }

    /// Convert to a `tiny_http` response, adding CORS headers for `origin`.
    #[must_use]
    pub fn into_http(self, origin: Option<&str>) -> tiny_http::Response<Cursor<Vec<u8>>> {
        let (bytes, content_type) = match self.body {
            Body::Empty => (Vec::new(), None),
            Body::Text(text) => (text.into_bytes(), Some("text/plain; charset=utf-8")),
            Body::Json(value) => (
                serde_json::to_vec(&value).unwrap_or_default(),
                Some("application/json"),
            ),
        };

        let mut response =
            tiny_http::Response::from_data(bytes).with_status_code(tiny_http::StatusCode(self.status));
        let headers = content_type
            .map(|value| ("Content-Type", value))
            .into_iter()
            .chain(origin.map(cors_headers).into_iter().flatten());
        for (name, value) in headers {
            if let Ok(header) = tiny_http::Header::from_bytes(name, value) {
                response.add_header(header);
            }
        }
        response
    }
}

/// Headers that let the configured front-end origin call the API.
#[must_use]
pub fn cors_headers(origin: &str) -> [(&'static str, &str); 3] {
    [
        ("Access-Control-Allow-Origin", origin),
        ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ]
}
