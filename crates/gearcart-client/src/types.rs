//! Request and response bodies for the storefront cart API.

use gearcart_core::{CartEntry, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Success envelope shared by the cart endpoints: `{ "items": [...] }`.
///
/// `items` is optional because some endpoints answer without an
/// authoritative list; callers must then re-fetch.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemsEnvelope {
    #[serde(default)]
    pub items: Option<Vec<CartEntry>>,
}

/// Body for `POST /cart` and `PUT /cart`.
#[derive(Debug, Serialize)]
pub(crate) struct QuantityRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Body for `POST /cart/sync`.
#[derive(Debug, Serialize)]
pub(crate) struct SyncRequest<'a> {
    pub cart_items: &'a [CartEntry],
}

/// Body for `POST /cart/calculate-shipping`.
#[derive(Debug, Serialize)]
pub(crate) struct ShippingRequest<'a> {
    pub items: &'a [CartEntry],
}

/// Shipping figures quoted by the backend for a cart snapshot.
///
/// Only `shipping_cost` is guaranteed; the rest are echoed when the backend
/// includes them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShippingEstimate {
    #[serde(alias = "shipping_fee", alias = "shippingCost", alias = "shippingFee")]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default, alias = "totalWeight")]
    pub total_weight: Option<Decimal>,
    #[serde(default, alias = "freeShipping", alias = "is_free_shipping")]
    pub free_shipping: Option<bool>,
}
