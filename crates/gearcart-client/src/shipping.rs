use gearcart_core::CartEntry;
use reqwest::Method;

use crate::client::CartClient;
use crate::error::ClientError;
use crate::types::{ShippingEstimate, ShippingRequest};

impl CartClient {
    /// Asks the backend to quote shipping for a cart snapshot via the public
    /// `POST /cart/calculate-shipping` endpoint. Works without a token.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the snapshot.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the quote has no shipping cost.
    pub async fn calculate_shipping(
        &self,
        items: &[CartEntry],
    ) -> Result<ShippingEstimate, ClientError> {
        let url = self.endpoint(&["cart", "calculate-shipping"]);
        let builder = self
            .request(Method::POST, url)
            .json(&ShippingRequest { items });
        let body = self
            .send(builder, "POST /cart/calculate-shipping")
            .await?;
        Self::decode(&body, "POST /cart/calculate-shipping")
    }
}
