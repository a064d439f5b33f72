//! Sending side of the reconciler's inbound queue.

use thiserror::Error;
use tokio::sync::mpsc;

use super::event::ReconciliationEvent;

/// The receiving side of a channel has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel closed")]
pub struct ChannelClosed;

/// A cloneable handle for delivering triggers to a running reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    tx: mpsc::Sender<ReconciliationEvent>,
}

impl ReconcilerHandle {
    /// Creates the inbound queue: a handle for the sources and the receiver
    /// to pass to [`PaymentReconciler::run`](super::PaymentReconciler::run).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReconciliationEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ReconcilerHandle { tx }, rx)
    }

    pub async fn send(&self, event: ReconciliationEvent) -> Result<(), ChannelClosed> {
        self.tx.send(event).await.map_err(|_| ChannelClosed)
    }

    /// Returns true once the reconciler has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
