//! chatgate - Chat Completion Gateway Client
//!
//! A client for HTTP endpoints implementing the OpenAI-style chat completions
//! contract. Produces either one complete text result or a live stream of
//! text fragments decoded from Server-Sent Events.
//!
//! ```no_run
//! use chatgate::{GatewayClient, GatewayConfig, DEFAULT_MODEL};
//!
//! # async fn run() -> chatgate::Result<()> {
//! let client = GatewayClient::with_config(GatewayConfig::new("sk-..."))?;
//!
//! let text = client.generate_text("Say hi", DEFAULT_MODEL).await?;
//!
//! let mut stream = client.generate_text_stream("Count to five", DEFAULT_MODEL).await?;
//! while let Some(fragment) = stream.next_fragment().await {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod title;

pub use api::{ChatCompletionOptions, ChatCompletionResponse, ChatMessage, Role, Usage};
pub use client::{FragmentStream, HttpClient, ResponseStream, StreamState};
pub use config::{ConfigLoader, GatewayConfig};
pub use error::{GatewayError, Result};

use api::RequestBody;
use tokio_util::sync::CancellationToken;

/// Model used by the single-prompt helpers when the caller has no preference
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Client for an OpenAI-compatible chat completions gateway
///
/// Holds only read-only configuration and a transport handle, so it can be
/// shared across tasks behind an `Arc`. Each call owns its own buffers.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Resolved credential and endpoint
    config: GatewayConfig,

    /// HTTP client
    http_client: HttpClient,
}

impl GatewayClient {
    /// Create a client from the default configuration sources
    pub fn new() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::with_config(loader.into_config())
    }

    /// Create a client from an explicit configuration
    pub fn with_config(config: GatewayConfig) -> Result<Self> {
        if !config.is_configured() {
            tracing::warn!("AI gateway API key is not configured; requests will be refused");
        }

        Ok(Self {
            config,
            http_client: HttpClient::new()?,
        })
    }

    /// Create a client with a caller-supplied transport
    pub fn with_http_client(config: GatewayConfig, http_client: HttpClient) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Whether a usable API key is configured
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(GatewayError::NotConfigured)
        }
    }

    /// Make a buffered completion request
    ///
    /// Always sends `stream: false`.
    pub async fn create_chat_completion(
        &self,
        options: &ChatCompletionOptions,
    ) -> Result<ChatCompletionResponse> {
        self.ensure_configured()?;

        let body = RequestBody::from_options(options).streaming(false);
        let url = self.config.completions_url();

        tracing::info!(
            model = %body.model,
            message_count = body.messages.len(),
            max_tokens = body.max_tokens,
            stream = false,
            "sending chat completion"
        );

        let response = self
            .http_client
            .post_json(&url, &body, &self.config.api_key)
            .await?;

        tracing::debug!(
            id = %response.id,
            finish_reason = response.finish_reason().unwrap_or("none"),
            "chat completion received"
        );

        Ok(response)
    }

    /// Make a streaming completion request
    ///
    /// Always sends `stream: true`. The returned stream yields content
    /// fragments in provider order and releases the connection when it ends,
    /// is closed, or is dropped.
    pub async fn stream_chat_completion(
        &self,
        options: &ChatCompletionOptions,
    ) -> Result<ResponseStream> {
        self.open_stream(options, None).await
    }

    /// Like [`stream_chat_completion`](Self::stream_chat_completion), stopping
    /// when `token` is cancelled
    ///
    /// Cancellation before the response arrives fails with `Cancelled`;
    /// afterwards the stream simply ends.
    pub async fn stream_chat_completion_with_cancellation(
        &self,
        options: &ChatCompletionOptions,
        token: CancellationToken,
    ) -> Result<ResponseStream> {
        self.open_stream(options, Some(token)).await
    }

    async fn open_stream(
        &self,
        options: &ChatCompletionOptions,
        token: Option<CancellationToken>,
    ) -> Result<ResponseStream> {
        self.ensure_configured()?;

        let body = RequestBody::from_options(options).streaming(true);
        let url = self.config.completions_url();

        tracing::info!(
            model = %body.model,
            message_count = body.messages.len(),
            max_tokens = body.max_tokens,
            stream = true,
            "sending chat completion"
        );

        let source = self
            .http_client
            .post_stream(&url, &body, &self.config.api_key, token.as_ref())
            .await?;

        let stream = FragmentStream::new(source);
        Ok(match token {
            Some(token) => stream.with_cancellation(token),
            None => stream,
        })
    }

    /// Run a conversation and return the first choice's content
    ///
    /// Every option except `stream` is forwarded as given.
    pub async fn chat_completion(&self, options: &ChatCompletionOptions) -> Result<String> {
        let response = self.create_chat_completion(options).await?;
        Ok(response.content().to_string())
    }

    /// Generate text for a single user prompt
    pub async fn generate_text(&self, prompt: &str, model: &str) -> Result<String> {
        let options = ChatCompletionOptions::new(model, vec![ChatMessage::user(prompt)]);
        self.chat_completion(&options).await
    }

    /// Stream text for a single user prompt
    pub async fn generate_text_stream(&self, prompt: &str, model: &str) -> Result<ResponseStream> {
        let options = ChatCompletionOptions::new(model, vec![ChatMessage::user(prompt)]);
        self.stream_chat_completion(&options).await
    }

    /// Generate a short title for a document's text
    ///
    /// Returns `Ok(None)` when the model's answer is empty after cleanup.
    pub async fn generate_title(&self, content: &str, model: &str) -> Result<Option<String>> {
        self.ensure_configured()?;
        if content.trim().is_empty() {
            return Err(GatewayError::EmptyContent);
        }

        let raw = self
            .generate_text(&title::title_prompt(content), model)
            .await?;
        Ok(title::clean_title(&raw))
    }
}
