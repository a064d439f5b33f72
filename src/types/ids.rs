//! Newtype wrappers for identifiers and credentials.
//!
//! These keep order ids and bearer tokens from being confused with each other
//! (or with any other string) as they flow between the slot, the deep-link
//! parser and the gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A server-side order identifier.
///
/// Order ids are opaque strings as far as this crate is concerned; the
/// order API decides their format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Creates a new order id.
    ///
    /// Note: This does not validate the format. Use [`OrderId::parse`] for
    /// untrusted input.
    pub fn new(s: impl Into<String>) -> Self {
        OrderId(s.into())
    }

    /// Parses an order id from untrusted input (a query parameter, a file).
    ///
    /// Surrounding whitespace is trimmed; an empty result means "no order".
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(OrderId(trimmed.to_string()))
        }
    }

    /// Returns the order id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty or only whitespace. A blank id never
    /// names a pending order.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        OrderId(s.to_string())
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        OrderId(s)
    }
}

/// A bearer token for the order API.
///
/// `Debug` and `Display` are redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    /// Returns the raw token for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
