//! In-memory pending-payment slot.
//!
//! Useful for hosts that keep their own durable storage and mirror it into
//! the reconciler, and for tests. Nothing survives a restart.

use std::sync::Mutex;

use super::{PersistentSlot, Result};
use crate::types::{OrderId, PendingPayment};

/// A [`PersistentSlot`] backed by a mutex-protected `Option`.
#[derive(Debug, Default)]
pub struct MemorySlot {
    pending: Mutex<Option<PendingPayment>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot already holding `order_id`.
    pub fn holding(order_id: impl Into<OrderId>) -> Self {
        MemorySlot {
            pending: Mutex::new(Some(PendingPayment::new(order_id.into()))),
        }
    }

    /// Returns the current order id without going through the async API.
    pub fn peek(&self) -> Option<OrderId> {
        self.lock()
            .as_ref()
            .map(|p| p.order_id.clone())
            .filter(|id| !id.is_blank())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingPayment>> {
        // The guarded value is a plain Option, so a poisoned lock still holds
        // a consistent record.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PersistentSlot for MemorySlot {
    async fn get(&self) -> Result<Option<PendingPayment>> {
        Ok(self.lock().clone().filter(|p| !p.order_id.is_blank()))
    }

    async fn set(&self, order_id: &OrderId) -> Result<PendingPayment> {
        let pending = PendingPayment::new(order_id.clone());
        *self.lock() = Some(pending.clone());
        Ok(pending)
    }

    async fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}
