//! Core domain types for payment reconciliation.

pub mod ids;
pub mod order;

pub use ids::{AuthToken, OrderId};
pub use order::{OrderSnapshot, OrderStatus, PaymentType, PendingPayment};
