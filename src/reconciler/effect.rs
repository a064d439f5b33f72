//! Outward effects, as data.
//!
//! The reconciler never touches screens. It emits these values on a channel
//! and the UI layer decides how to present them.

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayErrorKind;
use crate::types::OrderId;

/// Which terminal screen to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Cancel,
}

/// Why a reconciliation attempt gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The persistent slot could not be read or cleared.
    Storage,
    Unauthorized,
    NotFound,
    Transient,
}

impl From<GatewayErrorKind> for FailureKind {
    fn from(kind: GatewayErrorKind) -> Self {
        match kind {
            GatewayErrorKind::Unauthorized => FailureKind::Unauthorized,
            GatewayErrorKind::NotFound => FailureKind::NotFound,
            GatewayErrorKind::Transient => FailureKind::Transient,
        }
    }
}

/// A serializable summary of a failure, safe to hand to the UI or a log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub message: String,
}

/// An instruction for the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Show the terminal screen for this order. Emitted at most once per
    /// resolved payment.
    NavigateToOutcome { kind: OutcomeKind, order_id: OrderId },

    /// The order API rejected the token (or there was none). Ask the user to
    /// log in; the pending order is kept and re-checked afterwards.
    ReauthRequired { order_id: OrderId },

    /// A check gave up. Nothing changed for the user; the pending order is
    /// kept for the next trigger.
    ReconciliationAborted {
        #[serde(skip_serializing_if = "Option::is_none")]
        order_id: Option<OrderId>,
        failure: FailureReport,
    },
}

impl Effect {
    pub fn navigate(kind: OutcomeKind, order_id: OrderId) -> Self {
        Effect::NavigateToOutcome { kind, order_id }
    }

    /// Returns true for the navigation effect.
    pub fn is_navigation(&self) -> bool {
        matches!(self, Effect::NavigateToOutcome { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_serializes_with_tag() {
        let effect = Effect::navigate(OutcomeKind::Success, OrderId::new("order1"));
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "effect": "navigate_to_outcome",
                "kind": "success",
                "order_id": "order1"
            })
        );
    }

    #[test]
    fn aborted_omits_missing_fields() {
        let effect = Effect::ReconciliationAborted {
            order_id: None,
            failure: FailureReport {
                kind: FailureKind::Storage,
                status_code: None,
                message: "disk full".to_string(),
            },
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert!(json.get("order_id").is_none());
        assert!(json["failure"].get("status_code").is_none());
        assert_eq!(json["failure"]["kind"], "storage");
    }

    #[test]
    fn gateway_kinds_map_onto_failure_kinds() {
        assert_eq!(
            FailureKind::from(GatewayErrorKind::Unauthorized),
            FailureKind::Unauthorized
        );
        assert_eq!(
            FailureKind::from(GatewayErrorKind::NotFound),
            FailureKind::NotFound
        );
        assert_eq!(
            FailureKind::from(GatewayErrorKind::Transient),
            FailureKind::Transient
        );
    }
}
