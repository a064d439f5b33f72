//! Payment Reconciler - drives pending checkout payments to a definite outcome.
//!
//! A checkout leaves the app for an external provider. When the user comes
//! back, a return deep link and a foreground resume race each other. This
//! library turns both signals into one authoritative order-status check and
//! tells the host to show the outcome screen exactly once.

pub mod config;
pub mod deeplink;
pub mod gateway;
pub mod host;
pub mod lifecycle;
pub mod persistence;
pub mod reconciler;
pub mod types;

#[cfg(test)]
pub mod test_utils;
