//! HTTP client for the storefront backend's cart API.
//!
//! Wraps `reqwest` with bearer-token handling, envelope decoding, and error
//! message extraction. Every non-2xx answer becomes [`ClientError::Api`]
//! carrying whatever message the backend put in the body.

use std::time::Duration;

use gearcart_core::{cart::normalize_entries, CartEntry, ProductId};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::{extract_error_message, ClientError};
use crate::service::CartService;
use crate::types::{ItemsEnvelope, QuantityRequest, SyncRequest};

const DEFAULT_USER_AGENT: &str = "gearcart/0.1 (storefront-cart)";

/// Client for the storefront cart API.
///
/// Use [`CartClient::new`] for a guest (anonymous) client and
/// [`CartClient::with_token`] to attach a session's bearer token.
#[derive(Clone)]
pub struct CartClient {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for CartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl CartClient {
    /// Creates a client rooted at `base_url` (e.g. `https://shop.example/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` cannot be parsed or cannot carry a path.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        let user_agent = if user_agent.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            user_agent
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(format!(
                "'{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url: parsed,
            token: None,
        })
    }

    /// Returns a copy of this client that authenticates as the given session.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on network failure and
    /// [`ClientError::Api`] on any non-2xx status.
    pub(crate) async fn send(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> Result<String, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(&body);
            tracing::warn!(
                context,
                status = status.as_u16(),
                message = message.as_deref().unwrap_or(""),
                "cart API request rejected"
            );
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(context, status = status.as_u16(), "cart API request ok");
        Ok(body)
    }

    pub(crate) fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ClientError> {
        serde_json::from_str(body).map_err(|e| ClientError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }

    /// Decodes the `{ items }` envelope. An empty body or an envelope
    /// without `items` means the backend did not return a list.
    fn items_from_body(body: &str, context: &str) -> Result<Option<Vec<CartEntry>>, ClientError> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        let envelope: ItemsEnvelope = Self::decode(body, context)?;
        Ok(envelope.items.map(normalize_entries))
    }
}

impl CartService for CartClient {
    async fn fetch(&self) -> Result<Vec<CartEntry>, ClientError> {
        let url = self.endpoint(&["cart"]);
        let body = self
            .send(self.request(Method::GET, url), "GET /cart")
            .await?;
        Ok(Self::items_from_body(&body, "GET /cart")?.unwrap_or_default())
    }

    async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<Vec<CartEntry>>, ClientError> {
        let url = self.endpoint(&["cart"]);
        let builder = self
            .request(Method::POST, url)
            .json(&QuantityRequest {
                product_id,
                quantity,
            });
        let body = self.send(builder, "POST /cart").await?;
        Self::items_from_body(&body, "POST /cart")
    }

    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<Vec<CartEntry>>, ClientError> {
        let url = self.endpoint(&["cart"]);
        let builder = self
            .request(Method::PUT, url)
            .json(&QuantityRequest {
                product_id,
                quantity,
            });
        let body = self.send(builder, "PUT /cart").await?;
        Self::items_from_body(&body, "PUT /cart")
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<(), ClientError> {
        let url = self.endpoint(&["cart", product_id.as_str()]);
        self.send(self.request(Method::DELETE, url), "DELETE /cart/{id}")
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["cart"]);
        self.send(self.request(Method::DELETE, url), "DELETE /cart")
            .await?;
        Ok(())
    }

    async fn bulk_sync(&self, items: &[CartEntry]) -> Result<Option<Vec<CartEntry>>, ClientError> {
        let url = self.endpoint(&["cart", "sync"]);
        let builder = self
            .request(Method::POST, url)
            .json(&SyncRequest { cart_items: items });
        let body = self.send(builder, "POST /cart/sync").await?;
        Self::items_from_body(&body, "POST /cart/sync")
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
