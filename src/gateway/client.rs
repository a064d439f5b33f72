//! HTTP client for the order status endpoint.
//!
//! Issues `GET {base_url}/orders/{order_id}` with a bearer token and decodes
//! the JSON body into an [`OrderSnapshot`].

use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, instrument};

use super::OrderStatusGateway;
use super::error::GatewayError;
use crate::types::{AuthToken, OrderId, OrderSnapshot};

/// Order API client.
#[derive(Clone)]
pub struct HttpOrderGateway {
    http: Client,
    base_url: String,
}

impl HttpOrderGateway {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// `timeout` bounds each request end to end; an expired timeout surfaces
    /// as a transient error.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Creates a client around a pre-configured `reqwest::Client`.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpOrderGateway { http, base_url }
    }

    /// Returns the API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn order_url(&self, order_id: &OrderId) -> String {
        format!(
            "{}/orders/{}",
            self.base_url,
            urlencoding::encode(order_id.as_str())
        )
    }
}

impl OrderStatusGateway for HttpOrderGateway {
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    async fn fetch_status(
        &self,
        order_id: &OrderId,
        token: &AuthToken,
    ) -> Result<OrderSnapshot, GatewayError> {
        let url = self.order_url(order_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = GatewayError::from_status(status.as_u16(), &body);
            debug!(status = status.as_u16(), kind = %err.kind, "Order lookup failed");
            return Err(err);
        }

        let snapshot: OrderSnapshot = response.json().await.map_err(GatewayError::from_reqwest)?;
        debug!(
            balance = ?snapshot.balance,
            status = ?snapshot.status,
            "Fetched order snapshot"
        );
        Ok(snapshot)
    }
}

impl std::fmt::Debug for HttpOrderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOrderGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
