//! storefront-hex: hexagonal storefront API library (services + inbound HTTP + Khalti adapter)

pub mod auth;
pub mod config;
pub mod errors;

pub mod application;

pub use storefront_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
pub mod outbound; // payment gateway adapters
