//! Shared domain types, pricing rules, and configuration for the gearcart
//! storefront cart engine.

pub mod app_config;
pub mod cart;
pub mod config;
pub mod pricing;

pub use app_config::{AppConfig, Environment};
pub use cart::{CartEntry, Product, ProductId};
pub use config::{load_app_config, load_app_config_from_env};
pub use pricing::{CartTotals, ShippingSchedule};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
