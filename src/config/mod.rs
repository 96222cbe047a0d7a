//! Configuration Module
//!
//! Gateway credential resolution and the configured-ness gate.

pub mod gateway;
pub mod loader;

pub use gateway::{GatewayConfig, DEFAULT_BASE_URL, PLACEHOLDER_API_KEY};
pub use loader::{ConfigLoader, FileConfig, API_KEY_ENV, BASE_URL_ENV, CONFIG_PATH_ENV};
