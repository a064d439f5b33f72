//! Payment reconciliation.
//!
//! The reconciler consumes triggers from a single queue (deep links and
//! foreground resumes), decides whether the pending order has been paid, and
//! emits [`Effect`]s for the surrounding application.
//!
//! Two guarantees hold for every client:
//!
//! - At most one slot read/lookup/clear sequence is in flight. Triggers that
//!   arrive meanwhile are coalesced into it.
//! - Navigation for a given payment happens at most once. The slot is cleared
//!   before the effect is emitted.

mod effect;
mod engine;
mod event;
mod guard;
mod handle;


pub use effect::{Effect, FailureKind, FailureReport, OutcomeKind};
pub use engine::{AttemptOutcome, PaymentReconciler, ReconcilerError, ReconcilerStats};
pub use event::ReconciliationEvent;
pub use guard::{Phase, SingleFlight};
pub use handle::{ChannelClosed, ReconcilerHandle};
