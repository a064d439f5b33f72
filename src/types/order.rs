//! Order and pending-payment types.
//!
//! `OrderSnapshot` mirrors the order API's JSON response. Only `balance` is
//! guaranteed by the API; the remaining fields are carried for logging and
//! for callers that want them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::OrderId;

/// Fulfilment status of an order as reported by the order API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    OnProcess,
    Delivered,
    PickedUp,
    Cancelled,
    Refunded,
    RequestingRefund,

    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

/// How the customer chose to pay for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Full,
    DownPayment,

    /// Any payment type this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A fresh view of an order, fetched once per reconciliation attempt.
///
/// Snapshots are never cached: each check must reflect the server's state at
/// the moment of the check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    #[serde(default, deserialize_with = "deserialize_flexible_id")]
    pub id: Option<OrderId>,

    #[serde(default)]
    pub status: Option<OrderStatus>,

    /// Remaining amount to be paid. Absent or null means nothing is owed.
    #[serde(default)]
    pub balance: Option<f64>,

    #[serde(default)]
    pub payment_type: Option<PaymentType>,
}

impl OrderSnapshot {
    /// Returns true if nothing remains to be paid.
    ///
    /// A missing balance counts as paid, as does zero. NaN is treated the
    /// same as a missing value.
    pub fn is_settled(&self) -> bool {
        match self.balance {
            None => true,
            Some(b) if b.is_nan() => true,
            Some(b) => b <= 0.0,
        }
    }

    /// Returns the outstanding balance, treating absent values as zero.
    pub fn outstanding(&self) -> f64 {
        match self.balance {
            Some(b) if b.is_finite() && b > 0.0 => b,
            _ => 0.0,
        }
    }
}

/// Accepts `"id": "abc"` as well as `"id": 42`.
fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<Option<OrderId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => OrderId::parse(&s),
        Some(serde_json::Value::Number(n)) => Some(OrderId(n.to_string())),
        _ => None,
    })
}

/// The one record held by the persistent slot.
///
/// Only one checkout can be in flight from this client at a time, so a new
/// record replaces any previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub order_id: OrderId,

    /// When the checkout session was started.
    pub set_at: DateTime<Utc>,
}

impl PendingPayment {
    /// Creates a record stamped with the current time.
    pub fn new(order_id: OrderId) -> Self {
        PendingPayment {
            order_id,
            set_at: Utc::now(),
        }
    }
}
