//! Order status gateway.
//!
//! The reconciler's only window onto server truth. One read-only call:
//! given an order id and a bearer token, return a fresh [`OrderSnapshot`]
//! or a typed [`GatewayError`].
//!
//! No retries happen here. A failed lookup is reported once and the next
//! organic trigger (another resume, another deep link) is the retry.

mod auth;
mod client;
mod error;

use std::future::Future;

use crate::types::{AuthToken, OrderId, OrderSnapshot};

pub use auth::{AuthTokens, SharedToken};
pub use client::HttpOrderGateway;
pub use error::{GatewayError, GatewayErrorKind, classify_status};

/// Looks up the current status of an order.
///
/// Implementations must be side-effect free on the server.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct PaidGateway;
///
/// impl OrderStatusGateway for PaidGateway {
///     async fn fetch_status(
///         &self,
///         order_id: &OrderId,
///         _token: &AuthToken,
///     ) -> Result<OrderSnapshot, GatewayError> {
///         Ok(OrderSnapshot {
///             id: Some(order_id.clone()),
///             status: None,
///             balance: Some(0.0),
///             payment_type: None,
///         })
///     }
/// }
/// ```
pub trait OrderStatusGateway: Send + Sync {
    fn fetch_status(
        &self,
        order_id: &OrderId,
        token: &AuthToken,
    ) -> impl Future<Output = Result<OrderSnapshot, GatewayError>> + Send;
}
