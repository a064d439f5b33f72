//! Navigation intents produced from incoming URIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::OrderId;

/// Decoded query parameters of a deep link. Duplicate keys keep the last value.
pub type QueryParams = BTreeMap<String, String>;

/// Query keys that may carry the order id, checked in order.
const ORDER_ID_KEYS: &[&str] = &["orderId", "order_id", "order"];

/// What an incoming URI asks the app to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum NavigationIntent {
    /// The checkout provider reports a completed checkout.
    Success { params: QueryParams },

    /// The checkout provider reports that the user cancelled.
    Cancel { params: QueryParams },

    /// Unrelated or unparseable URI.
    Ignored,
}

impl NavigationIntent {
    pub fn is_ignored(&self) -> bool {
        matches!(self, NavigationIntent::Ignored)
    }

    /// Returns the query parameters, if this intent carries any.
    pub fn params(&self) -> Option<&QueryParams> {
        match self {
            NavigationIntent::Success { params } | NavigationIntent::Cancel { params } => {
                Some(params)
            }
            NavigationIntent::Ignored => None,
        }
    }

    /// Returns the order id embedded in the URI, if any.
    ///
    /// This is informational only; the persistent slot is the ground truth
    /// for which order is pending.
    pub fn order_id(&self) -> Option<OrderId> {
        let params = self.params()?;
        ORDER_ID_KEYS
            .iter()
            .find_map(|key| params.get(*key))
            .and_then(|v| OrderId::parse(v))
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            NavigationIntent::Success { .. } => "success",
            NavigationIntent::Cancel { .. } => "cancel",
            NavigationIntent::Ignored => "ignored",
        }
    }
}
