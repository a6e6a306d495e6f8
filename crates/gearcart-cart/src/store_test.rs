use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use gearcart_client::{CartService, ClientError};
use gearcart_core::cart::merge_entry;
use gearcart_core::{CartEntry, Product, ProductId};
use rust_decimal::Decimal;

use super::*;
use crate::local::GUEST_CART_KEY;
use crate::storage::{KeyValueStorage, MemoryStorage};

/// In-memory stand-in for the backend cart service.
#[derive(Default)]
struct FakeService {
    remote: Mutex<Vec<CartEntry>>,
    calls: Mutex<Vec<String>>,
    /// When set, the next call fails with this status and message.
    fail_next: Mutex<Option<(u16, String)>>,
    /// When `true`, mutating calls answer without an authoritative list.
    withhold_lists: bool,
    /// When set, the next `bulk_sync` never completes.
    stall_next_sync: Mutex<bool>,
    /// Product ids the backend keeps in the cart across a clear.
    reserved: Vec<&'static str>,
}

impl FakeService {
    fn with_remote(items: Vec<CartEntry>) -> Self {
        Self {
            remote: Mutex::new(items),
            ..Self::default()
        }
    }

    fn fail_next(&self, status: u16, message: &str) {
        *self.fail_next.lock().unwrap() = Some((status, message.to_owned()));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn begin(&self, call: &str) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call.to_owned());
        match self.fail_next.lock().unwrap().take() {
            Some((status, message)) => Err(ClientError::Api {
                status,
                message: Some(message),
            }),
            None => Ok(()),
        }
    }

    fn answer(&self) -> Option<Vec<CartEntry>> {
        if self.withhold_lists {
            None
        } else {
            Some(self.remote.lock().unwrap().clone())
        }
    }
}

impl CartService for FakeService {
    async fn fetch(&self) -> Result<Vec<CartEntry>, ClientError> {
        self.begin("fetch")?;
        Ok(self.remote.lock().unwrap().clone())
    }

    async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<Vec<CartEntry>>, ClientError> {
        self.begin(&format!("add {product_id} {quantity}"))?;
        merge_entry(
            &mut self.remote.lock().unwrap(),
            entry(product_id.as_str(), quantity, "1000"),
        );
        Ok(self.answer())
    }

    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Option<Vec<CartEntry>>, ClientError> {
        self.begin(&format!("set {product_id} {quantity}"))?;
        if let Some(e) = self
            .remote
            .lock()
            .unwrap()
            .iter_mut()
            .find(|e| &e.product_id == product_id)
        {
            e.quantity = quantity;
        }
        Ok(self.answer())
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<(), ClientError> {
        self.begin(&format!("remove {product_id}"))?;
        self.remote
            .lock()
            .unwrap()
            .retain(|e| &e.product_id != product_id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        self.begin("clear")?;
        self.remote
            .lock()
            .unwrap()
            .retain(|e| self.reserved.contains(&e.product_id.as_str()));
        Ok(())
    }

    async fn bulk_sync(&self, items: &[CartEntry]) -> Result<Option<Vec<CartEntry>>, ClientError> {
        let summary: Vec<String> = items
            .iter()
            .map(|e| format!("{}x{}", e.product_id, e.quantity))
            .collect();
        self.begin(&format!("sync {}", summary.join(",")))?;
        let stall = std::mem::take(&mut *self.stall_next_sync.lock().unwrap());
        if stall {
            std::future::pending::<()>().await;
        }
        let mut remote = self.remote.lock().unwrap();
        for item in items {
            merge_entry(&mut remote, item.clone());
        }
        Ok(if self.withhold_lists {
            None
        } else {
            Some(remote.clone())
        })
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn entry(id: &str, quantity: u32, price: &str) -> CartEntry {
    CartEntry {
        product_id: ProductId::new(id),
        quantity,
        unit_price: dec(price),
        sale_price_override: None,
        weight_grams: None,
        name: id.to_owned(),
        thumbnail: None,
    }
}

fn product(id: &str, price: &str, weight: Option<&str>) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: dec(price),
        sale_price: None,
        weight: weight.map(dec),
        image_url: None,
    }
}

fn quantities(store: &CartStore<FakeService, MemoryStorage>) -> Vec<(String, u32)> {
    store
        .items()
        .iter()
        .map(|e| (e.product_id.to_string(), e.quantity))
        .collect()
}

fn guest_storage(items: &[CartEntry]) -> MemoryStorage {
    MemoryStorage::new().with_slot(GUEST_CART_KEY, &serde_json::to_string(items).unwrap())
}

async fn guest_store(service: FakeService, storage: MemoryStorage) -> CartStore<FakeService, MemoryStorage> {
    let mut store = CartStore::new(service, LocalCartStore::new(storage));
    store.initialize(AuthState::Guest).await.unwrap();
    store
}

async fn authed_store(service: FakeService) -> CartStore<FakeService, MemoryStorage> {
    let mut store = CartStore::new(service, LocalCartStore::new(MemoryStorage::new()));
    store.initialize(AuthState::Authenticated).await.unwrap();
    store
}

// --- guest mode ---

#[tokio::test]
async fn guest_start_loads_persisted_cart_without_network() {
    let storage = guest_storage(&[entry("kb", 2, "15800")]);
    let store = guest_store(FakeService::default(), storage).await;

    assert_eq!(store.sync_state(), SyncState::Guest);
    assert_eq!(quantities(&store), vec![("kb".to_owned(), 2)]);
    assert!(store.service().calls().is_empty());
}

#[tokio::test]
async fn repeated_adds_keep_one_entry_with_summed_quantity() {
    let mut store = guest_store(FakeService::default(), MemoryStorage::new()).await;
    let mouse = product("mouse", "4800", Some("90"));

    store.add_to_cart(&mouse, 1).await.unwrap();
    store.add_to_cart(&mouse, 2).await.unwrap();
    store.add_to_cart(&mouse, 4).await.unwrap();

    assert_eq!(quantities(&store), vec![("mouse".to_owned(), 7)]);
    let persisted: Vec<CartEntry> =
        serde_json::from_str(store.local().storage().raw(GUEST_CART_KEY).unwrap()).unwrap();
    assert_eq!(persisted, store.items());
}

#[tokio::test]
async fn add_with_zero_quantity_is_ignored() {
    let mut store = guest_store(FakeService::default(), MemoryStorage::new()).await;
    store
        .add_to_cart(&product("mouse", "4800", None), 0)
        .await
        .unwrap();
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn removing_missing_product_leaves_items_unchanged() {
    let storage = guest_storage(&[entry("kb", 1, "100"), entry("pad", 2, "50")]);
    let mut store = guest_store(FakeService::default(), storage).await;
    let before = store.items().to_vec();

    store
        .remove_from_cart(&ProductId::new("ghost"))
        .await
        .unwrap();

    assert_eq!(store.items(), before.as_slice());
}

#[tokio::test]
async fn non_positive_quantity_removes_entry() {
    let storage = guest_storage(&[entry("kb", 1, "100"), entry("pad", 2, "50")]);
    let mut store = guest_store(FakeService::default(), storage).await;

    store
        .update_quantity(&ProductId::new("kb"), 0)
        .await
        .unwrap();
    store
        .update_quantity(&ProductId::new("pad"), -5)
        .await
        .unwrap();

    assert!(store.items().is_empty());
}

#[tokio::test]
async fn update_quantity_sets_existing_and_ignores_missing() {
    let storage = guest_storage(&[entry("kb", 1, "100")]);
    let mut store = guest_store(FakeService::default(), storage).await;

    store
        .update_quantity(&ProductId::new("kb"), 4)
        .await
        .unwrap();
    store
        .update_quantity(&ProductId::new("ghost"), 3)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("kb".to_owned(), 4)]);
}

#[tokio::test]
async fn guest_clear_empties_memory_and_storage() {
    let storage = guest_storage(&[entry("kb", 1, "100")]);
    let mut store = guest_store(FakeService::default(), storage).await;

    store.clear_cart().await.unwrap();

    assert!(store.items().is_empty());
    assert!(store.local().storage().raw(GUEST_CART_KEY).is_none());
}

#[tokio::test]
async fn guest_save_failure_keeps_cart_usable() {
    let mut storage = MemoryStorage::new();
    storage.fail_writes = true;
    let mut store = guest_store(FakeService::default(), storage).await;

    store
        .add_to_cart(&product("kb", "100", None), 1)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("kb".to_owned(), 1)]);
    assert!(store.local().is_degraded());
    assert!(store.state().error().is_none());
}

#[tokio::test]
async fn oversized_persisted_weight_does_not_break_totals() {
    let storage = MemoryStorage::new().with_slot(
        GUEST_CART_KEY,
        r#"[{"product_id":"a","quantity":10,"price":"100","weight":"1e28"}]"#,
    );
    let store = guest_store(FakeService::default(), storage).await;

    assert_eq!(store.items().len(), 1);
    let totals = store.totals();
    assert_eq!(totals.total_weight_grams, dec("10000"));
    assert_eq!(totals.shipping_cost, dec("750"));
    assert_eq!(store.total(), dec("1750"));
}

#[tokio::test]
async fn derived_values_follow_items() {
    let mut store = guest_store(FakeService::default(), MemoryStorage::new()).await;

    store
        .add_to_cart(&product("headset", "2500", Some("1250")), 2)
        .await
        .unwrap();

    assert_eq!(store.subtotal(), dec("5000"));
    assert_eq!(store.total_weight_grams(), dec("2500"));
    assert_eq!(store.shipping_cost(), dec("400"));
    assert_eq!(store.total(), dec("5400"));
    assert_eq!(store.item_count(), 2);
    assert!(!store.is_free_shipping_eligible());
    assert_eq!(store.amount_remaining_for_free_shipping(), dec("10000"));

    store
        .update_quantity(&ProductId::new("headset"), 6)
        .await
        .unwrap();

    let totals = store.totals();
    assert_eq!(totals.subtotal, dec("15000"));
    assert_eq!(totals.shipping_cost, Decimal::ZERO);
    assert!(totals.is_free_shipping_eligible);
    assert_eq!(totals.amount_remaining_for_free_shipping, Decimal::ZERO);
}

// --- authenticated mode ---

#[tokio::test]
async fn authenticated_start_fetches_remote_cart() {
    let service = FakeService::with_remote(vec![entry("kb", 1, "15800")]);
    let store = authed_store(service).await;

    assert_eq!(store.sync_state(), SyncState::Authenticated);
    assert_eq!(quantities(&store), vec![("kb".to_owned(), 1)]);
    assert_eq!(store.service().calls(), vec!["fetch"]);
}

#[tokio::test]
async fn authenticated_add_adopts_returned_list() {
    let mut store = authed_store(FakeService::default()).await;

    store
        .add_to_cart(&product("kb", "15800", None), 2)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("kb".to_owned(), 2)]);
    assert_eq!(store.service().calls(), vec!["fetch", "add kb 2"]);
    assert!(!store.state().loading());
}

#[tokio::test]
async fn authenticated_add_refetches_when_no_list_returned() {
    let service = FakeService {
        withhold_lists: true,
        ..FakeService::default()
    };
    let mut store = authed_store(service).await;

    store
        .add_to_cart(&product("kb", "15800", None), 1)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("kb".to_owned(), 1)]);
    assert_eq!(store.service().calls(), vec!["fetch", "add kb 1", "fetch"]);
}

#[tokio::test]
async fn authenticated_remove_refetches() {
    let service = FakeService::with_remote(vec![entry("kb", 1, "100"), entry("pad", 1, "50")]);
    let mut store = authed_store(service).await;

    store
        .remove_from_cart(&ProductId::new("kb"))
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("pad".to_owned(), 1)]);
    assert_eq!(
        store.service().calls(),
        vec!["fetch", "remove kb", "fetch"]
    );
}

#[tokio::test]
async fn authenticated_zero_quantity_delegates_to_remove() {
    let service = FakeService::with_remote(vec![entry("kb", 3, "100")]);
    let mut store = authed_store(service).await;

    store
        .update_quantity(&ProductId::new("kb"), 0)
        .await
        .unwrap();

    assert!(store.items().is_empty());
    assert!(store
        .service()
        .calls()
        .iter()
        .all(|c| !c.starts_with("set")));
}

#[tokio::test]
async fn authenticated_clear_empties_remote_and_memory() {
    let service = FakeService::with_remote(vec![entry("kb", 3, "100")]);
    let mut store = authed_store(service).await;

    store.clear_cart().await.unwrap();

    assert!(store.items().is_empty());
    assert!(store.service().remote.lock().unwrap().is_empty());
}

#[tokio::test]
async fn authenticated_clear_adopts_what_the_backend_kept() {
    let service = FakeService {
        reserved: vec!["gift"],
        ..FakeService::with_remote(vec![entry("kb", 3, "100"), entry("gift", 1, "0")])
    };
    let mut store = authed_store(service).await;

    store.clear_cart().await.unwrap();

    assert_eq!(quantities(&store), vec![("gift".to_owned(), 1)]);
    assert_eq!(store.service().calls(), vec!["fetch", "clear", "fetch"]);
}

#[tokio::test]
async fn remote_failure_is_recorded_and_returned_then_cleared() {
    let service = FakeService::with_remote(vec![entry("kb", 1, "100")]);
    let mut store = authed_store(service).await;
    store.service().fail_next(409, "Out of stock");

    let err = store
        .add_to_cart(&product("kb", "100", None), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::Remote(_)));
    assert_eq!(err.user_message(), "Out of stock");
    assert_eq!(store.state().error(), Some("Out of stock"));
    assert!(!store.state().loading());
    assert_eq!(quantities(&store), vec![("kb".to_owned(), 1)]);

    store
        .update_quantity(&ProductId::new("kb"), 2)
        .await
        .unwrap();
    assert!(store.state().error().is_none());
    assert_eq!(quantities(&store), vec![("kb".to_owned(), 2)]);
}

// --- auth transitions ---

#[tokio::test]
async fn login_merges_guest_cart_and_clears_local_store() {
    let service = FakeService::with_remote(vec![entry("c", 1, "300")]);
    let storage = guest_storage(&[entry("a", 2, "100"), entry("b", 1, "200")]);
    let mut store = guest_store(service, storage).await;

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(store.sync_state(), SyncState::Authenticated);
    assert_eq!(
        quantities(&store),
        vec![
            ("c".to_owned(), 1),
            ("a".to_owned(), 2),
            ("b".to_owned(), 1)
        ]
    );
    assert_eq!(store.service().calls(), vec!["sync ax2,bx1"]);
    assert!(store.local().storage().raw(GUEST_CART_KEY).is_none());
}

#[tokio::test]
async fn login_with_empty_guest_cart_just_fetches() {
    let service = FakeService::with_remote(vec![entry("c", 1, "300")]);
    let mut store = guest_store(service, MemoryStorage::new()).await;

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("c".to_owned(), 1)]);
    assert_eq!(store.service().calls(), vec!["fetch"]);
}

#[tokio::test]
async fn login_without_merged_list_refetches_after_sync() {
    let service = FakeService {
        withhold_lists: true,
        ..FakeService::default()
    };
    let storage = guest_storage(&[entry("a", 2, "100")]);
    let mut store = guest_store(service, storage).await;

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("a".to_owned(), 2)]);
    assert_eq!(store.service().calls(), vec!["sync ax2", "fetch"]);
}

#[tokio::test]
async fn duplicate_login_notifications_sync_once() {
    let storage = guest_storage(&[entry("a", 2, "100")]);
    let mut store = guest_store(FakeService::default(), storage).await;

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();
    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("a".to_owned(), 2)]);
    assert_eq!(store.service().calls(), vec!["sync ax2"]);
}

#[tokio::test]
async fn failed_sync_keeps_guest_items_and_allows_retry() {
    let storage = guest_storage(&[entry("a", 2, "100"), entry("b", 1, "200")]);
    let mut store = guest_store(FakeService::default(), storage).await;
    store.service().fail_next(503, "Cart service unavailable");

    let err = store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::Sync(_)));
    assert_eq!(store.sync_state(), SyncState::Guest);
    assert_eq!(store.state().error(), Some("Cart service unavailable"));
    assert_eq!(
        quantities(&store),
        vec![("a".to_owned(), 2), ("b".to_owned(), 1)]
    );
    assert!(store.local().storage().raw(GUEST_CART_KEY).is_some());

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(store.sync_state(), SyncState::Authenticated);
    assert!(store.state().error().is_none());
    assert_eq!(
        store.service().calls(),
        vec!["sync ax2,bx1", "sync ax2,bx1"]
    );
    assert_eq!(store.service().remote.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn sync_reads_guest_cart_fresh_from_storage() {
    let mut store = guest_store(FakeService::default(), MemoryStorage::new()).await;
    store
        .add_to_cart(&product("a", "100", None), 1)
        .await
        .unwrap();

    // Another tab updated the guest slot after this store loaded it.
    let newer = serde_json::to_string(&[entry("a", 3, "100")]).unwrap();
    store
        .local
        .storage_mut()
        .set(GUEST_CART_KEY, &newer)
        .unwrap();

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(store.service().calls(), vec!["sync ax3"]);
    assert_eq!(quantities(&store), vec![("a".to_owned(), 3)]);
}

#[tokio::test]
async fn logout_reloads_guest_cart_without_network() {
    let service = FakeService::with_remote(vec![entry("kb", 1, "100")]);
    let storage = guest_storage(&[entry("pad", 2, "50")]);
    let mut store = CartStore::new(service, LocalCartStore::new(storage));
    store.initialize(AuthState::Authenticated).await.unwrap();

    store.on_auth_changed(AuthState::Guest).await.unwrap();

    assert_eq!(store.sync_state(), SyncState::Guest);
    assert_eq!(quantities(&store), vec![("pad".to_owned(), 2)]);
    assert_eq!(store.service().calls(), vec!["fetch"]);
}

#[tokio::test]
async fn guest_actions_after_logout_stay_local() {
    let service = FakeService::with_remote(vec![entry("kb", 1, "100")]);
    let mut store = authed_store(service).await;
    store.on_auth_changed(AuthState::Guest).await.unwrap();

    store
        .add_to_cart(&product("pad", "50", None), 1)
        .await
        .unwrap();

    assert_eq!(quantities(&store), vec![("pad".to_owned(), 1)]);
    assert_eq!(store.service().calls(), vec!["fetch"]);
    assert!(store.local().storage().raw(GUEST_CART_KEY).is_some());
}

#[tokio::test]
async fn cancelled_merge_falls_back_to_guest_and_retries() {
    let storage = guest_storage(&[entry("a", 2, "100")]);
    let mut store = guest_store(FakeService::default(), storage).await;
    *store.service().stall_next_sync.lock().unwrap() = true;

    let attempt = tokio::time::timeout(
        Duration::from_millis(50),
        store.on_auth_changed(AuthState::Authenticated),
    )
    .await;

    assert!(attempt.is_err(), "stalled merge should time out");
    assert_eq!(store.sync_state(), SyncState::Guest);
    assert!(!store.state().loading());
    assert!(store.local().storage().raw(GUEST_CART_KEY).is_some());

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .unwrap();

    assert_eq!(store.sync_state(), SyncState::Authenticated);
    assert_eq!(quantities(&store), vec![("a".to_owned(), 2)]);
    assert_eq!(store.service().calls(), vec!["sync ax2", "sync ax2"]);
    assert!(store.local().storage().raw(GUEST_CART_KEY).is_none());
}
