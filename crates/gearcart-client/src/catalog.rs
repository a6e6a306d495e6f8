//! Catalog lookups used to price guest-cart additions.

use gearcart_core::{Product, ProductId};
use reqwest::Method;

use crate::client::CartClient;
use crate::error::ClientError;

impl CartClient {
    /// Fetches a single product by id from `GET /products/{id}`.
    ///
    /// Accepts either the bare product object or a `{ "product": {...} }`
    /// wrapper.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the request (e.g. 404).
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not a product.
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, ClientError> {
        let url = self.endpoint(&["products", product_id.as_str()]);
        let context = format!("GET /products/{product_id}");
        let body = self.send(self.request(Method::GET, url), &context).await?;

        let mut value: serde_json::Value = Self::decode(&body, &context)?;
        let wrapped = value
            .get_mut("product")
            .filter(|inner| inner.is_object())
            .map(serde_json::Value::take);
        let product = wrapped.unwrap_or(value);
        serde_json::from_value(product).map_err(|e| ClientError::Deserialize { context, source: e })
    }
}
