//! Foreground-resume detection.
//!
//! The host reports every application state change it observes. The source
//! turns that level signal into an edge: exactly one [`Resume`] per
//! transition from `Background` or `Inactive` into `Active`. Repeated
//! `Active` reports and moves between the two non-active states never fire.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::reconciler::{ChannelClosed, ReconcilerHandle, ReconciliationEvent};

/// Application state as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

impl AppState {
    pub fn is_active(&self) -> bool {
        matches!(self, AppState::Active)
    }

    /// Parses the host's state names (`active`, `inactive`, `background`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "foreground" => Some(AppState::Active),
            "inactive" => Some(AppState::Inactive),
            "background" => Some(AppState::Background),
            _ => None,
        }
    }
}

/// The edge event: the app just came back to the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resume;

/// Pure edge detector over a stream of state observations.
#[derive(Debug, Clone)]
pub struct ResumeDetector {
    last: AppState,
}

impl ResumeDetector {
    /// Starts from the state the process is in when observation begins.
    pub fn new(initial: AppState) -> Self {
        ResumeDetector { last: initial }
    }

    /// Records an observation. Returns `Some(Resume)` only on a non-active
    /// to active transition.
    pub fn observe(&mut self, next: AppState) -> Option<Resume> {
        let fired = !self.last.is_active() && next.is_active();
        self.last = next;
        fired.then_some(Resume)
    }

    pub fn current(&self) -> AppState {
        self.last
    }
}

/// Sending half: the platform's "app state changed" hook.
#[derive(Debug, Clone)]
pub struct LifecycleFeed {
    tx: mpsc::Sender<AppState>,
}

impl LifecycleFeed {
    pub async fn report(&self, state: AppState) -> Result<(), ChannelClosed> {
        self.tx.send(state).await.map_err(|_| ChannelClosed)
    }
}

/// A lazy sequence of [`Resume`] edges.
#[derive(Debug)]
pub struct LifecycleSource {
    detector: ResumeDetector,
    rx: mpsc::Receiver<AppState>,
}

impl LifecycleSource {
    /// Creates a source and its feed. `initial` is the state at startup,
    /// normally `Active` for a process that was just launched.
    pub fn new(initial: AppState, capacity: usize) -> (Self, LifecycleFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let source = LifecycleSource {
            detector: ResumeDetector::new(initial),
            rx,
        };
        (source, LifecycleFeed { tx })
    }

    /// Waits for the next resume edge. Returns `None` once every feed is dropped.
    pub async fn next(&mut self) -> Option<Resume> {
        loop {
            let state = self.rx.recv().await?;
            let previous = self.detector.current();
            if let Some(resume) = self.detector.observe(state) {
                debug!(from = ?previous, "App resumed");
                return Some(resume);
            }
            trace!(from = ?previous, to = ?state, "Lifecycle change without resume");
        }
    }

    /// Pumps resume edges into the reconciler until the feed or the
    /// reconciler goes away.
    pub async fn forward_to(mut self, handle: ReconcilerHandle) {
        while self.next().await.is_some() {
            if handle
                .send(ReconciliationEvent::FromLifecycleResume)
                .await
                .is_err()
            {
                debug!("Reconciler gone, stopping lifecycle source");
                return;
            }
        }
        debug!("Lifecycle feed closed");
    }
}
