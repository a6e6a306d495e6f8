//! Cart line items and the catalog products they are built from.
//!
//! Wire decoding is deliberately forgiving: the same types are read from the
//! backend's JSON and from the persisted guest cart, and a malformed optional
//! field should degrade to "absent" instead of discarding the whole entry.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Weight assumed for a line item whose product has no usable weight (1 kg).
pub const DEFAULT_WEIGHT_GRAMS: u32 = 1000;

/// Opaque product identifier, stable across sessions.
///
/// The backend emits ids as either JSON numbers or strings; both decode to
/// the same textual id. Always serialized as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for ProductId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) if !s.trim().is_empty() => Ok(Self(s.trim().to_owned())),
            RawId::Text(_) => Err(serde::de::Error::custom("product id must not be empty")),
            RawId::Number(n) => Ok(Self(n.to_string())),
        }
    }
}

/// A catalog product as returned by `GET /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "product_id", alias = "productId")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    /// Catalog list price.
    pub price: Decimal,
    #[serde(
        default,
        alias = "salePrice",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub sale_price: Option<Decimal>,
    /// Shipping weight in grams.
    #[serde(
        default,
        alias = "weight_grams",
        alias = "weightGrams",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<Decimal>,
    #[serde(
        default,
        alias = "thumbnail",
        alias = "image",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// One line item in a cart.
///
/// `name` and `thumbnail` are carried for display only and never take part
/// in any pricing calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(alias = "productId")]
    pub product_id: ProductId,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Catalog list price at the time the entry was fetched.
    #[serde(rename = "price", alias = "unit_price", alias = "unitPrice")]
    pub unit_price: Decimal,

    #[serde(
        rename = "sale_price",
        default,
        alias = "salePrice",
        alias = "sale_price_override",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub sale_price_override: Option<Decimal>,

    #[serde(
        rename = "weight",
        default,
        alias = "weight_grams",
        alias = "weightGrams",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight_grams: Option<Decimal>,

    #[serde(default)]
    pub name: String,

    #[serde(
        rename = "image_url",
        default,
        alias = "thumbnail",
        alias = "image",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail: Option<String>,
}

impl CartEntry {
    /// Builds a line item for `quantity` units of `product`.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            unit_price: product.price,
            sale_price_override: product.sale_price,
            weight_grams: product.weight,
            name: product.name.clone(),
            thumbnail: product.image_url.clone(),
        }
    }

    /// The price actually charged per unit: the sale price when it is present
    /// and strictly lower than the list price, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price_override {
            Some(sale) if !sale.is_sign_negative() && sale < self.unit_price => sale,
            _ => self.unit_price,
        }
    }

    /// Per-unit weight in grams, falling back to [`DEFAULT_WEIGHT_GRAMS`]
    /// when the weight is missing or not positive.
    #[must_use]
    pub fn effective_weight_grams(&self) -> Decimal {
        match self.weight_grams {
            Some(w) if w > Decimal::ZERO => w,
            _ => Decimal::from(DEFAULT_WEIGHT_GRAMS),
        }
    }

    /// Effective price times quantity, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.effective_price()
            .saturating_mul(Decimal::from(self.quantity))
    }
}

/// Restores the cart invariants on a list received from outside (backend
/// response or persisted payload): entries with quantity 0 are dropped and
/// repeated product ids are folded into the first occurrence by summing
/// quantities. Insertion order is otherwise preserved.
#[must_use]
pub fn normalize_entries(entries: Vec<CartEntry>) -> Vec<CartEntry> {
    let mut out: Vec<CartEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.quantity == 0 {
            continue;
        }
        merge_entry(&mut out, entry);
    }
    out
}

/// Adds `incoming` to `items`, incrementing the quantity of an existing
/// entry for the same product instead of inserting a duplicate.
///
/// Only the quantity of an existing entry changes; its price and display
/// metadata are kept as they were.
pub fn merge_entry(items: &mut Vec<CartEntry>, incoming: CartEntry) {
    if let Some(existing) = items
        .iter_mut()
        .find(|i| i.product_id == incoming.product_id)
    {
        existing.quantity = existing.quantity.saturating_add(incoming.quantity);
    } else {
        items.push(incoming);
    }
}

/// Decodes an optional decimal from a JSON string or number, yielding `None`
/// for `null`, unparsable text, or any other JSON type.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(decimal_from_json))
}

fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_owned(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}
