//! Cart command handlers for the CLI.
//!
//! Each handler opens a [`CartStore`] over the configured backend and the
//! on-disk guest cart, runs one action, and prints the resulting cart.

use gearcart_cart::{AuthState, CartError, CartStore, FileStorage, LocalCartStore};
use gearcart_client::{CartClient, ClientError};
use gearcart_core::{AppConfig, ProductId};

pub(crate) type Store = CartStore<CartClient, FileStorage>;

fn build_store(config: &AppConfig, token: Option<&str>) -> anyhow::Result<Store> {
    let mut client = CartClient::new(
        &config.api_base_url,
        config.request_timeout_secs,
        &config.user_agent,
    )?;
    if let Some(token) = token {
        client = client.with_token(token);
    }
    let local = LocalCartStore::new(FileStorage::new(config.guest_cart_dir.clone()));
    Ok(CartStore::new(client, local))
}

/// Wraps a cart failure so the user-facing message prints first and the
/// underlying cause stays in the chain.
pub(crate) fn surface(err: CartError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

/// [`surface`] for calls made on the client directly, prefixed with what
/// was being attempted.
pub(crate) fn surface_client(err: ClientError, attempt: &str) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(format!("{attempt}: {message}"))
}

/// Opens the cart for the current session: the remote cart when a token is
/// present, the guest cart otherwise.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the remote cart cannot
/// be fetched.
pub(crate) async fn open_store(config: &AppConfig, token: Option<&str>) -> anyhow::Result<Store> {
    let mut store = build_store(config, token)?;
    let auth = if token.is_some() {
        AuthState::Authenticated
    } else {
        AuthState::Guest
    };
    store.initialize(auth).await.map_err(surface)?;
    Ok(store)
}

/// Look up `product_id` in the catalog and add `quantity` units of it.
///
/// # Errors
///
/// Returns an error if the product lookup or the add fails.
pub(crate) async fn run_add(store: &mut Store, product_id: &str, quantity: u32) -> anyhow::Result<()> {
    let id = ProductId::new(product_id);
    let product = store
        .service()
        .get_product(&id)
        .await
        .map_err(|e| surface_client(e, &format!("product '{product_id}'")))?;
    store.add_to_cart(&product, quantity).await.map_err(surface)?;
    println!("added {quantity} x {}", product.name);
    finish(store);
    Ok(())
}

/// # Errors
///
/// Returns an error if the remote update fails.
pub(crate) async fn run_update(store: &mut Store, product_id: &str, quantity: i64) -> anyhow::Result<()> {
    store
        .update_quantity(&ProductId::new(product_id), quantity)
        .await
        .map_err(surface)?;
    finish(store);
    Ok(())
}

/// # Errors
///
/// Returns an error if the remote removal fails.
pub(crate) async fn run_remove(store: &mut Store, product_id: &str) -> anyhow::Result<()> {
    store
        .remove_from_cart(&ProductId::new(product_id))
        .await
        .map_err(surface)?;
    finish(store);
    Ok(())
}

/// # Errors
///
/// Returns an error if the remote clear fails.
pub(crate) async fn run_clear(store: &mut Store) -> anyhow::Result<()> {
    store.clear_cart().await.map_err(surface)?;
    println!("cart cleared");
    finish(store);
    Ok(())
}

/// Start from the guest cart and fire the login transition, merging the
/// guest cart into the remote cart.
///
/// # Errors
///
/// Returns an error if the merge fails. The guest cart is left on disk in
/// that case, so running `sync` again retries it.
pub(crate) async fn run_sync(config: &AppConfig, token: &str) -> anyhow::Result<()> {
    let mut store = build_store(config, Some(token))?;
    store.initialize(AuthState::Guest).await.map_err(surface)?;

    let guest_items = store.items().len();
    if guest_items == 0 {
        println!("no guest items to merge; loading remote cart");
    } else {
        println!("merging {guest_items} guest item(s) into the remote cart");
    }

    store
        .on_auth_changed(AuthState::Authenticated)
        .await
        .map_err(surface)?;
    print_cart(&store);
    Ok(())
}

/// Print the backend's shipping quote next to the locally computed one.
///
/// # Errors
///
/// Returns an error if the backend cannot produce a quote.
pub(crate) async fn run_estimate(store: &Store) -> anyhow::Result<()> {
    if store.items().is_empty() {
        println!("cart is empty; nothing to estimate");
        return Ok(());
    }

    let quote = store
        .service()
        .calculate_shipping(store.items())
        .await
        .map_err(|e| surface_client(e, "shipping estimate"))?;
    let local = store.shipping_cost();

    println!("{:<10}{}", "BACKEND", quote.shipping_cost);
    println!("{:<10}{}", "LOCAL", local);
    if quote.shipping_cost != local {
        tracing::warn!(
            backend = %quote.shipping_cost,
            local = %local,
            "backend shipping quote differs from local calculation"
        );
    }
    Ok(())
}

fn finish(store: &Store) {
    if store.local().is_degraded() {
        eprintln!("warning: the guest cart could not be saved; changes last only for this run");
    }
    print_cart(store);
}

pub(crate) fn print_cart(store: &Store) {
    if store.items().is_empty() {
        println!("cart is empty");
        return;
    }

    let header = format!(
        "{:<16}{:>5}{:>12}{:>12}  NAME",
        "PRODUCT", "QTY", "PRICE", "LINE"
    );
    println!("{header}");
    for entry in store.items() {
        println!(
            "{:<16}{:>5}{:>12}{:>12}  {}",
            entry.product_id,
            entry.quantity,
            entry.effective_price(),
            entry.line_total(),
            entry.name
        );
    }

    let totals = store.totals();
    println!();
    println!("Items:    {}", totals.item_count);
    println!("Weight:   {} g", totals.total_weight_grams);
    println!("Subtotal: {}", totals.subtotal);
    if totals.is_free_shipping_eligible {
        println!("Shipping: {} (free)", totals.shipping_cost);
    } else {
        println!("Shipping: {}", totals.shipping_cost);
    }
    println!("Total:    {}", totals.total);
    if !totals.is_free_shipping_eligible {
        println!(
            "Add {} more for free shipping.",
            totals.amount_remaining_for_free_shipping
        );
    }
}
