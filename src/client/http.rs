//! HTTP Client
//!
//! Issues chat completion POSTs and classifies the responses. No retries
//! and no timeouts: both are left to the caller.

use crate::api::completion::{decode_response, ChatCompletionResponse, RequestBody};
use crate::client::stream::ByteStream;
use crate::error::{GatewayError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use tokio_util::sync::CancellationToken;

/// HTTP transport for the chat completions endpoint
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("chatgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn headers(api_key: &str, accept: &'static str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        // The message must not echo the key back.
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
            GatewayError::Config("API key contains characters not allowed in a header".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(headers)
    }

    /// Fail with `Http` for any non-2xx response, keeping the raw body
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "gateway returned an error status");

        Err(GatewayError::Http {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }

    /// POST a request and decode the complete JSON response
    pub async fn post_json(
        &self,
        url: &str,
        body: &RequestBody<'_>,
        api_key: &str,
    ) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(url)
            .headers(Self::headers(api_key, "application/json")?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let text = response.text().await?;

        decode_response(&text).inspect_err(|_| {
            tracing::debug!(
                body = %text.chars().take(500).collect::<String>(),
                "undecodable completion body"
            );
        })
    }

    /// POST a streaming request and return the raw body byte stream
    ///
    /// If `cancel` fires before the response headers (or, for an error
    /// status, the error body) arrive the request is dropped and `Cancelled`
    /// is returned.
    pub async fn post_stream(
        &self,
        url: &str,
        body: &RequestBody<'_>,
        api_key: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<ByteStream> {
        use async_stream::stream;
        use futures::StreamExt;

        let request = self
            .client
            .post(url)
            .headers(Self::headers(api_key, "text/event-stream")?)
            .json(body)
            .send();

        // Reading an error body is part of the cancellable section.
        let exchange = async { Self::check_status(request.await?).await };

        let response = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(GatewayError::Cancelled),
                result = exchange => result?,
            },
            None => exchange.await?,
        };

        if response.status() == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(GatewayError::MissingBody);
        }

        let mut byte_stream = response.bytes_stream();
        let s = stream! {
            while let Some(chunk) = byte_stream.next().await {
                yield chunk.map_err(GatewayError::from);
            }
        };

        Ok(Box::pin(s))
    }
}
