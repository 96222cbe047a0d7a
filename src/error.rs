//! Error Types
//!
//! Error handling for gateway operations.

use thiserror::Error;

/// Errors returned by the gateway client
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No usable API key; raised before any network attempt
    #[error("AI gateway API key is not configured. Set AI_GATEWAY_API_KEY or add `api_key` to chatgate.json")]
    NotConfigured,

    /// Non-2xx response from the gateway
    #[error("Gateway error: {status} {status_text} - {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    /// Transport or connection failure, before or during transfer
    #[error("Network error: {0}")]
    Network(String),

    /// The response carried no readable body stream
    #[error("Response has no readable body stream")]
    MissingBody,

    /// A buffered response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request was cancelled before a response arrived
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Title generation was requested for blank content
    #[error("Content is empty; add some text before generating a title")]
    EmptyContent,
}

impl GatewayError {
    /// HTTP status code, if this is an `Http` error
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the gateway rejected the credentials (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, GatewayError::Http { status: 401 | 403, .. })
    }

    /// Whether the failure happened at the transport level
    pub fn is_network_error(&self) -> bool {
        matches!(self, GatewayError::Network(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors carry the URL but never request headers.
        if err.is_connect() {
            GatewayError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_keeps_status() {
        let err = GatewayError::Http {
            status: 401,
            status_text: "Unauthorized".to_string(),
            body: r#"{"error":"invalid key"}"#.to_string(),
        };

        assert_eq!(err.status(), Some(401));
        assert!(err.is_auth_error());
        assert!(!err.is_network_error());
        assert_eq!(
            err.to_string(),
            r#"Gateway error: 401 Unauthorized - {"error":"invalid key"}"#
        );
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        assert_eq!(GatewayError::NotConfigured.status(), None);
        assert!(GatewayError::Network("reset".to_string()).is_network_error());
        assert!(!GatewayError::MissingBody.is_auth_error());
    }
}
