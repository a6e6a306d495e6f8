//! The reactive cart container consumed by the view layer.
//!
//! [`CartStore`] owns the in-memory [`CartState`], routes each action to the
//! local guest cart or the remote service depending on the sync state, and
//! recomputes every derived value from the current items on demand.
//!
//! Actions take `&mut self`, so two actions on the same store can never be
//! in flight at once.

use gearcart_client::{CartService, ClientError};
use gearcart_core::cart::{merge_entry, normalize_entries};
use gearcart_core::{CartEntry, CartTotals, Product, ProductId, ShippingSchedule};
use rust_decimal::Decimal;

use crate::error::CartError;
use crate::local::LocalCartStore;
use crate::state::{CartState, LoadingFlag};
use crate::storage::KeyValueStorage;
use crate::sync::{AuthState, Reconciled, SyncController, SyncState};

pub struct CartStore<S, K> {
    service: S,
    local: LocalCartStore<K>,
    sync: SyncController,
    schedule: ShippingSchedule,
    state: CartState,
}

impl<S, K> CartStore<S, K>
where
    S: CartService,
    K: KeyValueStorage,
{
    /// Creates an empty store in guest mode. Call [`CartStore::initialize`]
    /// before use to load the right source.
    #[must_use]
    pub fn new(service: S, local: LocalCartStore<K>) -> Self {
        Self {
            service,
            local,
            sync: SyncController::new(),
            schedule: ShippingSchedule::default(),
            state: CartState::default(),
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: ShippingSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Loads the guest cart or fetches the remote cart, depending on `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the remote cart cannot be fetched;
    /// the store is then authenticated with an empty item list.
    pub async fn initialize(&mut self, auth: AuthState) -> Result<(), CartError> {
        let result = {
            let _loading = LoadingFlag::raise(&mut self.state.loading);
            self.sync
                .start(auth, &self.service, &mut self.local)
                .await
        };
        let items = self.settle(result)?;
        self.state.items = normalize_entries(items);
        Ok(())
    }

    /// Reacts to a login or logout. On login the guest cart is merged into
    /// the remote cart exactly once; on logout the guest cart is reloaded.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Sync`] when the merge fails (the guest items stay
    /// in memory and on disk) or [`CartError::Remote`] when the follow-up
    /// fetch fails.
    pub async fn on_auth_changed(&mut self, auth: AuthState) -> Result<(), CartError> {
        let result = {
            let _loading = LoadingFlag::raise(&mut self.state.loading);
            self.sync
                .on_auth_changed(auth, &self.service, &mut self.local)
                .await
        };
        if let Reconciled::Replace(items) = self.settle(result)? {
            self.state.items = normalize_entries(items);
        }
        Ok(())
    }

    /// Adds `quantity` units of `product`, incrementing an existing entry for
    /// the same product. A zero quantity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the remote service rejects the add.
    pub async fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }
        tracing::debug!(product_id = %product.id, quantity, "add to cart");

        if self.sync.is_remote() {
            let result = {
                let _loading = LoadingFlag::raise(&mut self.state.loading);
                self.service.add_item(&product.id, quantity).await
            };
            let returned = self.settle(result)?;
            return self.adopt_or_refetch(returned).await;
        }

        merge_entry(
            &mut self.state.items,
            CartEntry::from_product(product, quantity),
        );
        self.persist_guest();
        Ok(())
    }

    /// Removes the entry for `product_id`. Removing a product that is not in
    /// the cart leaves the items unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the remote removal or the refresh
    /// that follows it fails.
    pub async fn remove_from_cart(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        tracing::debug!(%product_id, "remove from cart");

        if self.sync.is_remote() {
            let result = {
                let _loading = LoadingFlag::raise(&mut self.state.loading);
                self.service.remove_item(product_id).await
            };
            self.settle(result)?;
            return self.refetch().await;
        }

        self.state.items.retain(|e| &e.product_id != product_id);
        self.persist_guest();
        Ok(())
    }

    /// Sets the quantity of an existing entry. Any `quantity <= 0` removes
    /// the entry instead. Updating a product that is not in a guest cart is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the remote service rejects the update.
    pub async fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_from_cart(product_id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        tracing::debug!(%product_id, quantity, "update quantity");

        if self.sync.is_remote() {
            let result = {
                let _loading = LoadingFlag::raise(&mut self.state.loading);
                self.service.set_quantity(product_id, quantity).await
            };
            let returned = self.settle(result)?;
            return self.adopt_or_refetch(returned).await;
        }

        if let Some(entry) = self
            .state
            .items
            .iter_mut()
            .find(|e| &e.product_id == product_id)
        {
            entry.quantity = quantity;
        }
        self.persist_guest();
        Ok(())
    }

    /// Empties the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the remote clear or the refresh that
    /// follows it fails.
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        if self.sync.is_remote() {
            let result = {
                let _loading = LoadingFlag::raise(&mut self.state.loading);
                self.service.clear().await
            };
            self.settle(result)?;
            return self.refetch().await;
        }

        self.state.items.clear();
        self.local.clear();
        self.state.error = None;
        Ok(())
    }

    /// Re-reads the authoritative source for the current mode.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the remote cart cannot be fetched.
    pub async fn refresh(&mut self) -> Result<(), CartError> {
        if self.sync.is_remote() {
            return self.refetch().await;
        }
        self.state.items = self.local.load();
        self.state.error = None;
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> &CartState {
        &self.state
    }

    #[must_use]
    pub fn items(&self) -> &[CartEntry] {
        &self.state.items
    }

    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub fn local(&self) -> &LocalCartStore<K> {
        &self.local
    }

    /// All derived values for the current items.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.schedule.totals(&self.state.items)
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        gearcart_core::pricing::subtotal(&self.state.items)
    }

    #[must_use]
    pub fn total_weight_grams(&self) -> Decimal {
        self.schedule.total_weight_grams(&self.state.items)
    }

    #[must_use]
    pub fn shipping_cost(&self) -> Decimal {
        self.schedule
            .shipping_cost(self.subtotal(), self.total_weight_grams())
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal().saturating_add(self.shipping_cost())
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        gearcart_core::pricing::item_count(&self.state.items)
    }

    #[must_use]
    pub fn is_free_shipping_eligible(&self) -> bool {
        self.schedule.is_free_shipping(self.subtotal())
    }

    #[must_use]
    pub fn amount_remaining_for_free_shipping(&self) -> Decimal {
        self.schedule
            .amount_remaining_for_free_shipping(self.subtotal())
    }

    /// Ends a remote operation by recording or clearing the error message.
    fn settle<T, E>(&mut self, result: Result<T, E>) -> Result<T, CartError>
    where
        E: Into<CartError>,
    {
        match result {
            Ok(value) => {
                self.state.error = None;
                Ok(value)
            }
            Err(e) => {
                let err: CartError = e.into();
                tracing::warn!(error = %err, "cart operation failed");
                self.state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    async fn adopt_or_refetch(&mut self, returned: Option<Vec<CartEntry>>) -> Result<(), CartError> {
        match returned {
            Some(items) => {
                self.state.items = normalize_entries(items);
                Ok(())
            }
            None => self.refetch().await,
        }
    }

    async fn refetch(&mut self) -> Result<(), CartError> {
        let result: Result<Vec<CartEntry>, ClientError> = {
            let _loading = LoadingFlag::raise(&mut self.state.loading);
            self.service.fetch().await
        };
        let items = self.settle(result)?;
        self.state.items = normalize_entries(items);
        Ok(())
    }

    fn persist_guest(&mut self) {
        self.local.save(&self.state.items);
        self.state.error = None;
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
