//! Decides which store is authoritative and reconciles the two when the
//! session's authentication state changes.
//!
//! The controller is a three-state machine. `Guest` reads and writes the
//! local guest cart, `Authenticated` talks to the remote service, and
//! `Syncing` is held only while a login merge is in flight.

use gearcart_client::CartService;
use gearcart_core::CartEntry;

use crate::error::CartError;
use crate::local::LocalCartStore;
use crate::storage::KeyValueStorage;

/// Authentication status as reported by whoever owns the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Guest,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Guest,
    Authenticated,
    Syncing,
}

/// Result of reconciling after an auth notification.
#[derive(Debug, PartialEq)]
pub enum Reconciled {
    /// The notification did not change the state; keep the current items.
    Unchanged,
    /// Replace the in-memory items with this list.
    Replace(Vec<CartEntry>),
}

#[derive(Debug)]
pub struct SyncController {
    state: SyncState,
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SyncState::Guest,
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// `true` when actions should go to the remote service.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.state == SyncState::Authenticated
    }

    /// Picks the starting source from the current auth state and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if an authenticated session's cart
    /// cannot be fetched. The controller is `Authenticated` regardless.
    pub async fn start<S, K>(
        &mut self,
        auth: AuthState,
        service: &S,
        local: &mut LocalCartStore<K>,
    ) -> Result<Vec<CartEntry>, CartError>
    where
        S: CartService,
        K: KeyValueStorage,
    {
        match auth {
            AuthState::Authenticated => {
                self.state = SyncState::Authenticated;
                Ok(service.fetch().await?)
            }
            AuthState::Guest => {
                self.state = SyncState::Guest;
                Ok(local.load())
            }
        }
    }

    /// Handles a login or logout notification.
    ///
    /// Repeated notifications for the state the controller is already in are
    /// ignored, so duplicate auth events never trigger a second merge.
    ///
    /// # Errors
    ///
    /// - [`CartError::Sync`] if the guest cart could not be merged. The
    ///   controller drops back to `Guest` with the local cart untouched, so
    ///   the next login notification retries.
    /// - [`CartError::Remote`] if the remote cart could not be fetched after
    ///   an otherwise successful login.
    pub async fn on_auth_changed<S, K>(
        &mut self,
        auth: AuthState,
        service: &S,
        local: &mut LocalCartStore<K>,
    ) -> Result<Reconciled, CartError>
    where
        S: CartService,
        K: KeyValueStorage,
    {
        match (self.state, auth) {
            (SyncState::Guest, AuthState::Authenticated) => {
                self.login(service, local).await.map(Reconciled::Replace)
            }
            (SyncState::Authenticated, AuthState::Guest) => {
                tracing::info!("session logged out; switching to guest cart");
                self.state = SyncState::Guest;
                Ok(Reconciled::Replace(local.load()))
            }
            (state, auth) => {
                tracing::debug!(?state, ?auth, "auth notification ignored");
                Ok(Reconciled::Unchanged)
            }
        }
    }

    async fn login<S, K>(
        &mut self,
        service: &S,
        local: &mut LocalCartStore<K>,
    ) -> Result<Vec<CartEntry>, CartError>
    where
        S: CartService,
        K: KeyValueStorage,
    {
        let syncing = SyncingGuard::enter(&mut self.state);

        // Read the slot now rather than trusting any in-memory copy.
        let guest = local.load();

        if guest.is_empty() {
            tracing::info!("session logged in; no guest cart to merge");
            syncing.finish(SyncState::Authenticated);
            return Ok(service.fetch().await?);
        }

        tracing::info!(items = guest.len(), "session logged in; merging guest cart");
        let merged = match service.bulk_sync(&guest).await {
            Ok(merged) => merged,
            Err(e) => {
                tracing::warn!(error = %e, "guest cart merge failed; keeping guest cart");
                syncing.finish(SyncState::Guest);
                return Err(CartError::Sync(e));
            }
        };

        // Merged server-side; the guest slot must never be uploaded twice.
        local.clear();
        syncing.finish(SyncState::Authenticated);

        match merged {
            Some(items) => Ok(items),
            None => Ok(service.fetch().await?),
        }
    }
}

/// Holds the controller in `Syncing` for the duration of a merge. If the
/// merge future is dropped before [`SyncingGuard::finish`], the state falls
/// back to `Guest` with the local cart untouched.
struct SyncingGuard<'a> {
    state: &'a mut SyncState,
    finished: bool,
}

impl<'a> SyncingGuard<'a> {
    fn enter(state: &'a mut SyncState) -> Self {
        *state = SyncState::Syncing;
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self, next: SyncState) {
        *self.state = next;
        self.finished = true;
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("guest cart merge abandoned; staying in guest mode");
            *self.state = SyncState::Guest;
        }
    }
}
