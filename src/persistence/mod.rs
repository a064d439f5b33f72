//! Durable storage for the pending payment.
//!
//! The slot holds at most one [`PendingPayment`]: the order whose checkout
//! was started but not yet confirmed paid. It is written when the user leaves
//! the app for the external checkout page and cleared only by the reconciler
//! once the payment settles or is cancelled.
//!
//! # Crash Safety
//!
//! A crash between `set` and the matching `clear` must leave the order id in
//! the slot, so the next launch can still reconcile it. A failed write must
//! never destroy the value that was already there.
//!
//! # Implementations
//!
//! - [`FileSlot`]: JSON file written with temp-then-rename and fsync
//! - [`MemorySlot`]: process-local, for tests and hosts with their own storage

pub mod file;
pub mod memory;

use std::future::Future;
use std::io;

use thiserror::Error;
use tracing::{info, warn};

use crate::types::{OrderId, PendingPayment};

pub use file::{FileSlot, SCHEMA_VERSION, SLOT_FILE_NAME};
pub use memory::MemorySlot;

/// Errors raised by slot storage.
#[derive(Debug, Error)]
pub enum SlotError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The stored record could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored record was written by an incompatible version.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// The blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}

/// Result type for slot operations.
pub type Result<T> = std::result::Result<T, SlotError>;

/// A durable single-slot store for the pending order id.
///
/// Every operation is a suspension point: other events may be delivered to
/// the reconciler while one of these futures is pending.
pub trait PersistentSlot: Send + Sync {
    /// Returns the pending record, or `None` if nothing is pending.
    fn get(&self) -> impl Future<Output = Result<Option<PendingPayment>>> + Send;

    /// Durably replaces the slot contents with a fresh record for `order_id`.
    fn set(&self, order_id: &OrderId) -> impl Future<Output = Result<PendingPayment>> + Send;

    /// Removes the pending record. Clearing an empty slot is not an error.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Records the start of a checkout session.
///
/// Only one checkout can be in flight per client, so an unresolved order
/// already in the slot is overwritten. That is logged, since the previous
/// order will no longer be reconciled by this client.
pub async fn begin_checkout<S: PersistentSlot>(
    slot: &S,
    order_id: &OrderId,
) -> Result<PendingPayment> {
    match slot.get().await {
        Ok(Some(previous)) if previous.order_id != *order_id => {
            warn!(
                previous = %previous.order_id,
                previous_set_at = %previous.set_at,
                order_id = %order_id,
                "Overwriting unresolved pending payment"
            );
        }
        Ok(_) => {}
        Err(e) => {
            // Unreadable contents are about to be replaced anyway.
            warn!(error = %e, "Could not read slot before starting checkout");
        }
    }

    let pending = slot.set(order_id).await?;
    info!(order_id = %order_id, "Checkout started");
    Ok(pending)
}
