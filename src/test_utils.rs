//! Shared test doubles.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use crate::gateway::{AuthTokens, GatewayError, GatewayErrorKind, OrderStatusGateway};
use crate::persistence::{PersistentSlot, SlotError};
use crate::types::{AuthToken, OrderId, OrderSnapshot, OrderStatus, PaymentType, PendingPayment};

/// One scripted reply from [`MockGateway`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// A snapshot with this outstanding balance.
    Balance(f64),
    /// A failure of this kind.
    Fail(GatewayErrorKind),
}

impl Reply {
    fn into_result(self, order_id: &OrderId) -> Result<OrderSnapshot, GatewayError> {
        match self {
            Reply::Balance(balance) => Ok(OrderSnapshot {
                id: Some(order_id.clone()),
                status: Some(if balance > 0.0 {
                    OrderStatus::OnProcess
                } else {
                    OrderStatus::Delivered
                }),
                balance: Some(balance),
                payment_type: Some(PaymentType::Full),
            }),
            Reply::Fail(kind) => {
                let status = match kind {
                    GatewayErrorKind::Unauthorized => 401,
                    GatewayErrorKind::NotFound => 404,
                    GatewayErrorKind::Transient => 503,
                };
                Err(GatewayError::from_status(status, "scripted failure"))
            }
        }
    }
}

/// An order gateway that answers from a script and counts its calls.
///
/// Queued replies are used first, then the fallback. A gated mock parks
/// every call until the test adds a permit to the returned semaphore.
#[derive(Debug)]
pub struct MockGateway {
    queued: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    seen: Mutex<Vec<OrderId>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockGateway {
    pub fn replying(fallback: Reply) -> Self {
        MockGateway {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn paid() -> Self {
        Self::replying(Reply::Balance(0.0))
    }

    pub fn owing(balance: f64) -> Self {
        Self::replying(Reply::Balance(balance))
    }

    pub fn failing(kind: GatewayErrorKind) -> Self {
        Self::replying(Reply::Fail(kind))
    }

    /// Queues a reply ahead of the fallback.
    pub fn then(self, reply: Reply) -> Self {
        self.queued.lock().unwrap().push_back(reply);
        self
    }

    /// Parks each call until a permit is added to the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<OrderId> {
        self.seen.lock().unwrap().clone()
    }
}

impl OrderStatusGateway for MockGateway {
    async fn fetch_status(
        &self,
        order_id: &OrderId,
        _token: &AuthToken,
    ) -> Result<OrderSnapshot, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(order_id.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        reply.into_result(order_id)
    }
}

/// A fixed token source.
#[derive(Debug, Clone)]
pub struct StaticToken(pub Option<AuthToken>);

impl StaticToken {
    pub fn valid() -> Self {
        StaticToken(Some(AuthToken::new("test-token")))
    }

    pub fn missing() -> Self {
        StaticToken(None)
    }
}

impl AuthTokens for StaticToken {
    fn current_token(&self) -> Option<AuthToken> {
        self.0.clone()
    }
}

/// Which slot operation [`FailingSlot`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokenOp {
    Get,
    Clear,
}

/// A slot holding one order whose `get` or `clear` always fails.
#[derive(Debug)]
pub struct FailingSlot {
    pending: PendingPayment,
    broken: BrokenOp,
    clears: AtomicUsize,
}

impl FailingSlot {
    pub fn new(order_id: impl Into<OrderId>, broken: BrokenOp) -> Self {
        FailingSlot {
            pending: PendingPayment::new(order_id.into()),
            broken,
            clears: AtomicUsize::new(0),
        }
    }

    pub fn clear_attempts(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn failure() -> SlotError {
        SlotError::Io(io::Error::other("disk unavailable"))
    }
}

impl PersistentSlot for FailingSlot {
    async fn get(&self) -> crate::persistence::Result<Option<PendingPayment>> {
        match self.broken {
            BrokenOp::Get => Err(Self::failure()),
            BrokenOp::Clear => Ok(Some(self.pending.clone())),
        }
    }

    async fn set(&self, _order_id: &OrderId) -> crate::persistence::Result<PendingPayment> {
        Err(Self::failure())
    }

    async fn clear(&self) -> crate::persistence::Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Err(Self::failure())
    }
}
