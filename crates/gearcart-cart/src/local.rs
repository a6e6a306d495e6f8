//! Best-effort persistence of the guest cart.
//!
//! Nothing here returns an error. A guest cart that cannot be read is treated
//! as empty and a write that fails is logged and dropped; [`LocalCartStore::is_degraded`]
//! reports whether the most recent operation hit such a failure.

use gearcart_core::{cart::normalize_entries, CartEntry};

use crate::storage::KeyValueStorage;

/// Storage key of the guest-cart slot.
pub const GUEST_CART_KEY: &str = "gearcart_guest_cart";

pub struct LocalCartStore<K> {
    storage: K,
    key: String,
    degraded: bool,
}

impl<K: KeyValueStorage> LocalCartStore<K> {
    #[must_use]
    pub fn new(storage: K) -> Self {
        Self::with_key(storage, GUEST_CART_KEY)
    }

    #[must_use]
    pub fn with_key(storage: K, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            degraded: false,
        }
    }

    /// Returns the persisted guest cart, or an empty list when nothing is
    /// stored or the payload cannot be read or parsed.
    pub fn load(&mut self) -> Vec<CartEntry> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.degraded = false;
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart unreadable; starting empty");
                self.degraded = true;
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<CartEntry>>(&raw) {
            Ok(items) => {
                self.degraded = false;
                normalize_entries(items)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart payload corrupt; starting empty");
                self.degraded = true;
                Vec::new()
            }
        }
    }

    /// Overwrites the persisted guest cart. Failures are logged, never returned.
    pub fn save(&mut self, items: &[CartEntry]) {
        let payload = match serde_json::to_string(items) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart could not be encoded");
                self.degraded = true;
                return;
            }
        };
        match self.storage.set(&self.key, &payload) {
            Ok(()) => {
                tracing::debug!(key = %self.key, items = items.len(), "guest cart saved");
                self.degraded = false;
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart save failed");
                self.degraded = true;
            }
        }
    }

    /// Removes the persisted guest cart entirely.
    pub fn clear(&mut self) {
        match self.storage.remove(&self.key) {
            Ok(()) => self.degraded = false,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "guest cart clear failed");
                self.degraded = true;
            }
        }
    }

    /// `true` when the last load, save, or clear failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[must_use]
    pub fn storage(&self) -> &K {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut K {
        &mut self.storage
    }
}
