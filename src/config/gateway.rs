//! Gateway Configuration
//!
//! The resolved credential and endpoint the client talks to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default OpenAI-compatible gateway endpoint
pub const DEFAULT_BASE_URL: &str = "https://ai-gateway.vercel.sh/v1";

/// Placeholder shipped in template configs; never a real key
pub const PLACEHOLDER_API_KEY: &str = "TU_API_KEY_AQUI";

/// Resolved gateway configuration
///
/// Read-only once constructed. `Debug` redacts the key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bearer token sent to the gateway
    pub api_key: String,

    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,
}

impl GatewayConfig {
    /// Create a config for the default gateway endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether the key is usable: non-blank and not the placeholder
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("GatewayConfig")
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .finish()
    }
}
