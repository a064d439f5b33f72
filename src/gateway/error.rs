//! Order API error types.
//!
//! Failures are sorted into the three kinds the reconciler reacts to:
//!
//! - **Unauthorized**: the bearer token is stale or lacks access. The user
//!   must log in again before reconciliation can continue.
//! - **NotFound**: the API does not know the order.
//! - **Transient**: network trouble, timeouts, 5xx, rate limits, and any
//!   other response this client cannot use. The next trigger re-checks.
//!
//! None of these is retried here. The caller owns that decision.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest response-body excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 200;

/// The kind of order API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// HTTP 401 or 403, or no token available at all.
    Unauthorized,

    /// HTTP 404.
    NotFound,

    /// Timeouts, connection failures, 5xx, 429, undecodable bodies and
    /// unexpected 4xx responses.
    Transient,
}

impl GatewayErrorKind {
    /// Returns true if the user has to re-authenticate before retrying helps.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, GatewayErrorKind::Unauthorized)
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayErrorKind::Unauthorized => "unauthorized",
            GatewayErrorKind::NotFound => "not found",
            GatewayErrorKind::Transient => "transient",
        };
        f.write_str(s)
    }
}

/// An order API failure.
#[derive(Debug, Error)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,

    /// The HTTP status code, if a response was received.
    pub status_code: Option<u16>,

    pub message: String,

    /// The underlying transport error, if there was one.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "order API {} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "order API {}: {}", self.kind, self.message),
        }
    }
}

impl GatewayError {
    /// Creates an error of the given kind without a transport source.
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        GatewayError {
            kind,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transient, message)
    }

    /// Categorizes a non-2xx response.
    ///
    /// `body` is the response text; only a short excerpt is kept.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = classify_status(status);
        let excerpt = excerpt(body);
        let message = if excerpt.is_empty() {
            format!("request failed with status {status}")
        } else {
            excerpt
        };
        GatewayError {
            kind,
            status_code: Some(status),
            message,
            source: None,
        }
    }

    /// Categorizes a transport-level failure.
    ///
    /// Timeouts and connection errors are transient. Errors carrying a
    /// status code are classified by that code.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = match status_code {
            Some(code) => classify_status(code),
            None => GatewayErrorKind::Transient,
        };
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else if err.is_decode() {
            format!("malformed order response: {err}")
        } else {
            err.to_string()
        };
        GatewayError {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }
}

/// Maps an HTTP status code onto an error kind.
pub fn classify_status(status: u16) -> GatewayErrorKind {
    match status {
        401 | 403 => GatewayErrorKind::Unauthorized,
        404 => GatewayErrorKind::NotFound,
        _ => GatewayErrorKind::Transient,
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
