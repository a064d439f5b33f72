//! Deep-link event source.
//!
//! The host platform hands URIs to a [`DeepLinkFeed`]; the matching
//! [`DeepLinkSource`] yields one [`NavigationIntent`] per URI. The cold-start
//! URI (the one that launched the process, if any) is yielded first, once.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::intent::NavigationIntent;
use super::parser::{DeepLinkMarkers, classify};
use crate::reconciler::{ChannelClosed, ReconcilerHandle, ReconciliationEvent};

/// Sending half: the platform's "URI received" hook.
#[derive(Debug, Clone)]
pub struct DeepLinkFeed {
    tx: mpsc::Sender<String>,
}

impl DeepLinkFeed {
    /// Delivers a URI observed while the app is running.
    pub async fn deliver(&self, uri: impl Into<String>) -> Result<(), ChannelClosed> {
        self.tx.send(uri.into()).await.map_err(|_| ChannelClosed)
    }
}

/// A lazy sequence of navigation intents.
#[derive(Debug)]
pub struct DeepLinkSource {
    cold_start: Option<String>,
    rx: mpsc::Receiver<String>,
    markers: DeepLinkMarkers,
}

impl DeepLinkSource {
    /// Creates a source and its feed.
    ///
    /// `cold_start` is the URI the process was launched with, read once at
    /// startup by the host.
    pub fn new(
        cold_start: Option<String>,
        markers: DeepLinkMarkers,
        capacity: usize,
    ) -> (Self, DeepLinkFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let source = DeepLinkSource {
            cold_start,
            rx,
            markers,
        };
        (source, DeepLinkFeed { tx })
    }

    /// Returns the next intent, or `None` once every feed has been dropped.
    pub async fn next(&mut self) -> Option<NavigationIntent> {
        if let Some(uri) = self.cold_start.take() {
            trace!("Classifying cold-start URI");
            return Some(classify(&uri, &self.markers));
        }
        let uri = self.rx.recv().await?;
        Some(classify(&uri, &self.markers))
    }

    /// Pumps intents into the reconciler until the feed or the reconciler
    /// goes away. `Ignored` intents stop here.
    pub async fn forward_to(mut self, handle: ReconcilerHandle) {
        while let Some(intent) = self.next().await {
            if intent.is_ignored() {
                trace!("Dropping ignored deep link");
                continue;
            }
            debug!(intent = intent.label(), "Forwarding deep link");
            if handle
                .send(ReconciliationEvent::FromDeepLink(intent))
                .await
                .is_err()
            {
                debug!("Reconciler gone, stopping deep-link source");
                return;
            }
        }
        debug!("Deep-link feed closed");
    }
}
