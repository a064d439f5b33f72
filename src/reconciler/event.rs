//! Inbound reconciler messages.

use crate::deeplink::NavigationIntent;

/// A trigger delivered to the reconciler's single inbound queue.
///
/// Both sources feed the same queue, so ordering and coalescing are decided
/// in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationEvent {
    /// The checkout provider sent the user back with a deep link.
    FromDeepLink(NavigationIntent),

    /// The app came back to the foreground.
    FromLifecycleResume,
}

impl ReconciliationEvent {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ReconciliationEvent::FromDeepLink(NavigationIntent::Success { .. }) => "deep_link_success",
            ReconciliationEvent::FromDeepLink(NavigationIntent::Cancel { .. }) => "deep_link_cancel",
            ReconciliationEvent::FromDeepLink(NavigationIntent::Ignored) => "deep_link_ignored",
            ReconciliationEvent::FromLifecycleResume => "resume",
        }
    }
}
