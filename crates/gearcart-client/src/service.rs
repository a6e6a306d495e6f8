use std::future::Future;

use gearcart_core::{CartEntry, ProductId};

use crate::error::ClientError;

/// The backend cart operations an authenticated session relies on.
///
/// Each method maps to exactly one request. Methods returning
/// `Option<Vec<CartEntry>>` yield `Some` only when the backend included the
/// authoritative post-operation list; on `None` the caller must re-fetch.
/// [`CartClient`](crate::CartClient) is the HTTP implementation.
pub trait CartService {
    fn fetch(&self) -> impl Future<Output = Result<Vec<CartEntry>, ClientError>> + Send;

    fn add_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<Option<Vec<CartEntry>>, ClientError>> + Send;

    fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<Option<Vec<CartEntry>>, ClientError>> + Send;

    /// Never returns a list; the caller refreshes afterwards.
    fn remove_item(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn clear(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Uploads a whole guest cart, merging it into the user's remote cart.
    fn bulk_sync(
        &self,
        items: &[CartEntry],
    ) -> impl Future<Output = Result<Option<Vec<CartEntry>>, ClientError>> + Send;
}
