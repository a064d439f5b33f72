//! The reconciliation event loop.
//!
//! # Event Processing Flow
//!
//! 1. Pull the next trigger from the inbound queue
//! 2. Enter the single-flight guard synchronously (or coalesce the trigger)
//! 3. Run the attempt: read the slot, look up the order, clear on settlement
//! 4. Emit effects for the outcome and return to `Idle`
//! 5. Start a deferred cancel, if one arrived during the attempt
//!
//! # Critical Invariant
//!
//! The slot is cleared before the navigation effect is emitted, and only by
//! the attempt that observed settlement. A second attempt for the same order
//! finds the slot empty, so navigation fires at most once per payment.
//!
//! # Concurrency
//!
//! The loop runs as a single task. The in-flight attempt is polled alongside
//! the inbound queue, so triggers keep arriving (and coalescing) while a
//! lookup is outstanding. An attempt abandoned by shutdown leaves the slot as
//! it was: the default safe state is "assume unpaid, re-check later".

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use super::effect::{Effect, FailureKind, FailureReport, OutcomeKind};
use super::event::ReconciliationEvent;
use super::guard::{Phase, SingleFlight};
use crate::deeplink::NavigationIntent;
use crate::gateway::{AuthTokens, GatewayError, OrderStatusGateway};
use crate::persistence::{PersistentSlot, SlotError};
use crate::types::OrderId;

/// Why an attempt ended in `Aborted`.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// The persistent slot could not be read or cleared.
    #[error("storage failure: {0}")]
    Storage(#[from] SlotError),

    /// The order lookup failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The user is logged out, so no lookup was attempted.
    #[error("no auth token available")]
    MissingToken,
}

impl ReconcilerError {
    /// Returns true if the user must log in again before a re-check can succeed.
    pub fn needs_reauth(&self) -> bool {
        match self {
            ReconcilerError::Gateway(e) => e.kind.needs_reauth(),
            ReconcilerError::MissingToken => true,
            ReconcilerError::Storage(_) => false,
        }
    }

    /// Summarizes the failure for the effect channel.
    pub fn report(&self) -> FailureReport {
        match self {
            ReconcilerError::Storage(e) => FailureReport {
                kind: FailureKind::Storage,
                status_code: None,
                message: e.to_string(),
            },
            ReconcilerError::Gateway(e) => FailureReport {
                kind: e.kind.into(),
                status_code: e.status_code,
                message: e.message.clone(),
            },
            ReconcilerError::MissingToken => FailureReport {
                kind: FailureKind::Unauthorized,
                status_code: None,
                message: self.to_string(),
            },
        }
    }
}

/// Terminal result of one attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The slot was empty; nothing to reconcile.
    NothingPending,

    /// The order is paid and the slot has been cleared.
    Settled { order_id: OrderId },

    /// The order still owes money. The slot is untouched.
    Unsettled { order_id: OrderId, balance: f64 },

    /// A cancel link was honoured. Any pending record has been cleared.
    Cancelled { order_id: OrderId },

    /// The attempt failed. The slot is untouched.
    Aborted {
        order_id: Option<OrderId>,
        error: ReconcilerError,
    },
}

/// An attempt in flight.
pub(crate) type Attempt = Pin<Box<dyn Future<Output = AttemptOutcome> + Send>>;

/// Counters describing what the reconciler has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    pub checks_started: u64,
    pub cancels_started: u64,
    /// Triggers absorbed by an attempt already in flight.
    pub coalesced: u64,
    pub nothing_pending: u64,
    pub settled: u64,
    pub unsettled: u64,
    pub cancelled: u64,
    pub aborted: u64,
}

/// A cancel link that arrived while a check was in flight.
#[derive(Debug)]
struct DeferredCancel {
    hint: Option<OrderId>,
}

/// Drives pending payments to a definite outcome.
///
/// One instance per client. The instance owns the single-flight guard, so
/// at most one slot read/lookup/clear sequence is outstanding at any time.
pub struct PaymentReconciler<S, G, A> {
    slot: Arc<S>,
    gateway: Arc<G>,
    tokens: Arc<A>,
    flight: SingleFlight,
    deferred_cancel: Option<DeferredCancel>,
    effects: mpsc::Sender<Effect>,
    stats: ReconcilerStats,
}

impl<S, G, A> PaymentReconciler<S, G, A>
where
    S: PersistentSlot + 'static,
    G: OrderStatusGateway + 'static,
    A: AuthTokens + 'static,
{
    /// Creates a reconciler that reports to `effects`.
    pub fn new(
        slot: Arc<S>,
        gateway: Arc<G>,
        tokens: Arc<A>,
        effects: mpsc::Sender<Effect>,
    ) -> Self {
        PaymentReconciler {
            slot,
            gateway,
            tokens,
            flight: SingleFlight::new(),
            deferred_cancel: None,
            effects,
            stats: ReconcilerStats::default(),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.flight.phase()
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }

    /// Runs the event loop until `shutdown` fires or every handle is dropped.
    ///
    /// When the inbound queue closes, an attempt already in flight is allowed
    /// to finish first. On `shutdown` it is abandoned.
    #[instrument(skip_all)]
    pub async fn run(
        mut self,
        mut inbox: mpsc::Receiver<ReconciliationEvent>,
        shutdown: CancellationToken,
    ) -> ReconcilerStats {
        info!("Reconciler event loop started");

        let mut in_flight: Option<Attempt> = None;
        let mut inbox_open = true;

        loop {
            if !inbox_open && in_flight.is_none() {
                info!("Inbound queue closed");
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    if in_flight.is_some() {
                        warn!(
                            phase = ?self.flight.phase(),
                            "Abandoning in-flight attempt; pending order is kept"
                        );
                    }
                    info!("Shutdown signal received, stopping reconciler");
                    break;
                }

                outcome = async {
                    match in_flight.as_mut() {
                        Some(attempt) => attempt.await,
                        None => std::future::pending().await,
                    }
                } => {
                    in_flight = self.complete(outcome).await;
                }

                msg = inbox.recv(), if inbox_open => {
                    match msg {
                        Some(event) => {
                            if let Some(attempt) = self.dispatch(event) {
                                debug_assert!(in_flight.is_none());
                                in_flight = Some(attempt);
                            }
                        }
                        None => inbox_open = false,
                    }
                }
            }
        }

        info!(stats = ?self.stats, "Reconciler event loop stopped");
        self.stats
    }

    /// Routes one trigger. Returns the attempt to start, if any.
    ///
    /// Guard entry happens here, synchronously, before the returned attempt
    /// is first polled.
    pub(crate) fn dispatch(&mut self, event: ReconciliationEvent) -> Option<Attempt> {
        let trigger = event.label();
        trace!(trigger, phase = ?self.flight.phase(), "Received event");

        match event {
            ReconciliationEvent::FromDeepLink(NavigationIntent::Ignored) => {
                trace!("Ignoring unrelated deep link");
                None
            }

            ReconciliationEvent::FromDeepLink(intent @ NavigationIntent::Cancel { .. }) => {
                let hint = intent.order_id();
                if self.flight.try_begin(Phase::Cancelling) {
                    self.stats.cancels_started += 1;
                    debug!(trigger, "Cancelling pending payment");
                    return Some(self.start_cancel(hint));
                }
                match self.flight.phase() {
                    Phase::Checking => {
                        info!("Cancel link arrived during a check; deferring until it completes");
                        self.deferred_cancel = Some(DeferredCancel { hint });
                    }
                    _ => {
                        self.stats.coalesced += 1;
                        debug!(trigger, "Duplicate cancel coalesced");
                    }
                }
                None
            }

            ReconciliationEvent::FromDeepLink(intent @ NavigationIntent::Success { .. }) => {
                self.begin_check(trigger, intent.order_id())
            }

            ReconciliationEvent::FromLifecycleResume => self.begin_check(trigger, None),
        }
    }

    fn begin_check(&mut self, trigger: &'static str, hint: Option<OrderId>) -> Option<Attempt> {
        if !self.flight.try_begin(Phase::Checking) {
            self.stats.coalesced += 1;
            debug!(
                trigger,
                phase = ?self.flight.phase(),
                "Coalescing trigger into in-flight attempt"
            );
            return None;
        }
        self.stats.checks_started += 1;
        debug!(trigger, "Starting payment check");
        Some(Box::pin(check_pending(
            Arc::clone(&self.slot),
            Arc::clone(&self.gateway),
            Arc::clone(&self.tokens),
            hint,
        )))
    }

    fn start_cancel(&self, hint: Option<OrderId>) -> Attempt {
        Box::pin(cancel_pending(Arc::clone(&self.slot), hint))
    }

    /// Applies an attempt's outcome, then returns to `Idle`.
    ///
    /// Returns a follow-up attempt when a deferred cancel still applies.
    pub(crate) async fn complete(&mut self, outcome: AttemptOutcome) -> Option<Attempt> {
        let resolved = matches!(
            outcome,
            AttemptOutcome::Settled { .. } | AttemptOutcome::Cancelled { .. }
        );

        match outcome {
            AttemptOutcome::NothingPending => {
                self.stats.nothing_pending += 1;
                debug!("No pending payment");
            }
            AttemptOutcome::Settled { order_id } => {
                self.stats.settled += 1;
                info!(order_id = %order_id, "Payment settled");
                self.emit(Effect::navigate(OutcomeKind::Success, order_id))
                    .await;
            }
            AttemptOutcome::Unsettled { order_id, balance } => {
                self.stats.unsettled += 1;
                info!(order_id = %order_id, balance, "Payment still outstanding");
            }
            AttemptOutcome::Cancelled { order_id } => {
                self.stats.cancelled += 1;
                info!(order_id = %order_id, "Checkout cancelled");
                self.emit(Effect::navigate(OutcomeKind::Cancel, order_id))
                    .await;
            }
            AttemptOutcome::Aborted { order_id, error } => {
                self.stats.aborted += 1;
                match &error {
                    ReconcilerError::Storage(e) => {
                        error!(order_id = ?order_id, error = %e, "Reconciliation aborted");
                    }
                    _ => {
                        warn!(order_id = ?order_id, error = %error, "Reconciliation aborted");
                    }
                }
                if error.needs_reauth()
                    && let Some(id) = &order_id
                {
                    self.emit(Effect::ReauthRequired {
                        order_id: id.clone(),
                    })
                    .await;
                }
                self.emit(Effect::ReconciliationAborted {
                    order_id,
                    failure: error.report(),
                })
                .await;
            }
        }

        let ended = self.flight.finish();
        trace!(phase = ?ended, "Attempt finished");

        let deferred = self.deferred_cancel.take()?;
        if resolved {
            info!("Dropping deferred cancel; payment already resolved");
            return None;
        }
        self.flight.try_begin(Phase::Cancelling);
        self.stats.cancels_started += 1;
        debug!("Starting deferred cancel");
        Some(self.start_cancel(deferred.hint))
    }

    async fn emit(&self, effect: Effect) {
        trace!(effect = ?effect, "Emitting effect");
        if self.effects.send(effect).await.is_err() {
            warn!("Effect receiver dropped; effect discarded");
        }
    }
}

/// Reads the slot, looks the order up, and clears the slot on settlement.
async fn check_pending<S, G, A>(
    slot: Arc<S>,
    gateway: Arc<G>,
    tokens: Arc<A>,
    hint: Option<OrderId>,
) -> AttemptOutcome
where
    S: PersistentSlot,
    G: OrderStatusGateway,
    A: AuthTokens,
{
    let pending = match slot.get().await {
        Ok(Some(pending)) => pending,
        Ok(None) => return AttemptOutcome::NothingPending,
        Err(e) => {
            return AttemptOutcome::Aborted {
                order_id: None,
                error: e.into(),
            };
        }
    };
    let order_id = pending.order_id;

    if let Some(hint) = hint
        && hint != order_id
    {
        debug!(
            link_order = %hint,
            order_id = %order_id,
            "Deep link names a different order; checking the pending one"
        );
    }

    let Some(token) = tokens.current_token() else {
        return AttemptOutcome::Aborted {
            order_id: Some(order_id),
            error: ReconcilerError::MissingToken,
        };
    };

    let snapshot = match gateway.fetch_status(&order_id, &token).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return AttemptOutcome::Aborted {
                order_id: Some(order_id),
                error: e.into(),
            };
        }
    };

    if !snapshot.is_settled() {
        return AttemptOutcome::Unsettled {
            order_id,
            balance: snapshot.outstanding(),
        };
    }

    // Clear before anyone is told, so a later trigger cannot navigate again.
    match slot.clear().await {
        Ok(()) => AttemptOutcome::Settled { order_id },
        Err(e) => AttemptOutcome::Aborted {
            order_id: Some(order_id),
            error: e.into(),
        },
    }
}

/// Clears the slot for a cancel link. No server confirmation is needed.
async fn cancel_pending<S>(slot: Arc<S>, hint: Option<OrderId>) -> AttemptOutcome
where
    S: PersistentSlot,
{
    let pending = match slot.get().await {
        Ok(Some(pending)) => pending,
        // The provider's cancel is authoritative even if the slot is gone.
        Ok(None) => {
            return match hint {
                Some(order_id) => AttemptOutcome::Cancelled { order_id },
                None => AttemptOutcome::NothingPending,
            };
        }
        Err(e) => {
            return AttemptOutcome::Aborted {
                order_id: None,
                error: e.into(),
            };
        }
    };
    let order_id = pending.order_id;

    if let Some(hint) = hint
        && hint != order_id
    {
        debug!(
            link_order = %hint,
            order_id = %order_id,
            "Cancel link names a different order; cancelling the pending one"
        );
    }

    match slot.clear().await {
        Ok(()) => AttemptOutcome::Cancelled { order_id },
        Err(e) => AttemptOutcome::Aborted {
            order_id: Some(order_id),
            error: e.into(),
        },
    }
}
