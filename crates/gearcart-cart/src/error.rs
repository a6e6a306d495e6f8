use gearcart_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    /// A cart action against the remote service failed.
    #[error("cart request failed: {0}")]
    Remote(#[from] ClientError),

    /// Merging the guest cart into the remote cart at login failed. The
    /// guest cart is still intact locally.
    #[error("guest cart sync failed: {0}")]
    Sync(#[source] ClientError),
}

impl CartError {
    /// Message suitable for inline display next to the triggering action.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.client_error().user_message()
    }

    #[must_use]
    pub fn client_error(&self) -> &ClientError {
        match self {
            CartError::Remote(e) | CartError::Sync(e) => e,
        }
    }
}
