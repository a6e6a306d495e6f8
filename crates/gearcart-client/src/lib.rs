//! Client for the storefront backend's cart, catalog, and shipping endpoints.

pub mod catalog;
pub mod client;
pub mod error;
pub mod service;
pub mod shipping;
pub mod types;

pub use client::CartClient;
pub use error::{ClientError, FALLBACK_MESSAGE};
pub use service::CartService;
pub use types::ShippingEstimate;
