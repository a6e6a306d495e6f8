//! Derived cart values: subtotal, weight, shipping tier, and grand total.
//!
//! Everything here is a pure function of the item list. Callers recompute on
//! every read rather than caching results next to the items.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::{CartEntry, DEFAULT_WEIGHT_GRAMS};

/// The storefront's shipping-fee schedule.
///
/// Orders at or above `free_shipping_threshold` ship free. Below it, the
/// first kilogram costs `base_fee` and every started kilogram beyond the
/// first adds `per_extra_kg_fee`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingSchedule {
    pub free_shipping_threshold: Decimal,
    pub base_fee: Decimal,
    pub per_extra_kg_fee: Decimal,
    pub default_weight_grams: Decimal,
}

impl Default for ShippingSchedule {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(15_000),
            base_fee: Decimal::from(300),
            per_extra_kg_fee: Decimal::from(50),
            default_weight_grams: Decimal::from(DEFAULT_WEIGHT_GRAMS),
        }
    }
}

impl ShippingSchedule {
    /// Shipping cost for an order of `subtotal` weighing `total_weight_grams`.
    ///
    /// The ceiling applies to the weight above the first kilogram, so 1.1 kg
    /// is charged as one extra kilogram. Arithmetic saturates at
    /// [`Decimal::MAX`] instead of overflowing.
    #[must_use]
    pub fn shipping_cost(&self, subtotal: Decimal, total_weight_grams: Decimal) -> Decimal {
        if self.is_free_shipping(subtotal) {
            return Decimal::ZERO;
        }
        let weight_kg = total_weight_grams / Decimal::ONE_THOUSAND;
        if weight_kg <= Decimal::ONE {
            return self.base_fee;
        }
        let extra_kg = (weight_kg - Decimal::ONE).ceil();
        self.base_fee
            .saturating_add(extra_kg.saturating_mul(self.per_extra_kg_fee))
    }

    #[must_use]
    pub fn is_free_shipping(&self, subtotal: Decimal) -> bool {
        subtotal >= self.free_shipping_threshold
    }

    /// How much more the customer must spend to ship free; zero once the
    /// threshold is reached.
    #[must_use]
    pub fn amount_remaining_for_free_shipping(&self, subtotal: Decimal) -> Decimal {
        self.free_shipping_threshold
            .saturating_sub(subtotal)
            .max(Decimal::ZERO)
    }

    fn entry_weight_grams(&self, entry: &CartEntry) -> Decimal {
        match entry.weight_grams {
            Some(w) if w > Decimal::ZERO => w,
            _ => self.default_weight_grams,
        }
    }

    /// Weight of one line in grams. A per-unit weight too large to multiply
    /// by the quantity is treated like a missing one.
    fn line_weight_grams(&self, entry: &CartEntry) -> Decimal {
        let quantity = Decimal::from(entry.quantity);
        self.entry_weight_grams(entry)
            .checked_mul(quantity)
            .unwrap_or_else(|| self.default_weight_grams.saturating_mul(quantity))
    }

    /// Sum of per-unit weight times quantity, in grams.
    #[must_use]
    pub fn total_weight_grams(&self, items: &[CartEntry]) -> Decimal {
        items.iter().fold(Decimal::ZERO, |acc, e| {
            acc.saturating_add(self.line_weight_grams(e))
        })
    }

    /// Computes every derived value for `items` in one pass over the schedule.
    #[must_use]
    pub fn totals(&self, items: &[CartEntry]) -> CartTotals {
        let subtotal = subtotal(items);
        let total_weight_grams = self.total_weight_grams(items);
        let shipping_cost = self.shipping_cost(subtotal, total_weight_grams);
        CartTotals {
            subtotal,
            total_weight_grams,
            shipping_cost,
            total: subtotal.saturating_add(shipping_cost),
            item_count: item_count(items),
            is_free_shipping_eligible: self.is_free_shipping(subtotal),
            amount_remaining_for_free_shipping: self.amount_remaining_for_free_shipping(subtotal),
        }
    }
}

/// Snapshot of the derived values for one item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub total_weight_grams: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub item_count: u64,
    pub is_free_shipping_eligible: bool,
    pub amount_remaining_for_free_shipping: Decimal,
}

/// Sum of effective price times quantity, saturating at [`Decimal::MAX`].
#[must_use]
pub fn subtotal(items: &[CartEntry]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.line_total()))
}

/// Total number of units across all entries.
#[must_use]
pub fn item_count(items: &[CartEntry]) -> u64 {
    items.iter().map(|e| u64::from(e.quantity)).sum()
}

/// [`ShippingSchedule::totals`] under the default business schedule.
#[must_use]
pub fn totals(items: &[CartEntry]) -> CartTotals {
    ShippingSchedule::default().totals(items)
}
