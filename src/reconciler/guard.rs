//! Single-flight guard for reconciliation attempts.
//!
//! The guard is a plain value owned by the reconciler. Entering it is a
//! synchronous compare-and-set, performed before the first suspension point
//! of an attempt, so two triggers delivered back to back cannot both pass.

/// What the reconciler is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing in flight.
    #[default]
    Idle,

    /// Looking up the pending order's status.
    Checking,

    /// Clearing the slot after a cancel link.
    Cancelling,
}

/// At most one attempt in flight, global to this client.
#[derive(Debug, Default)]
pub struct SingleFlight {
    phase: Phase,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves from `Idle` to `phase`. Returns false, leaving the current
    /// phase untouched, if an attempt is already in flight.
    pub fn try_begin(&mut self, phase: Phase) -> bool {
        debug_assert_ne!(phase, Phase::Idle, "cannot begin an idle attempt");
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = phase;
        true
    }

    /// Returns to `Idle`, handing back the phase that just ended.
    pub fn finish(&mut self) -> Phase {
        std::mem::take(&mut self.phase)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }
}
