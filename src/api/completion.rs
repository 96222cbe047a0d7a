//! Chat Completion API
//!
//! Request and response types for the chat completions endpoint.

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Sampling temperature used when the caller does not pick one
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Options for a chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionOptions {
    /// Model identifier, e.g. `openai/gpt-4o-mini`
    pub model: String,

    /// Conversation, sent in order
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature (defaults to 0.7 on the wire)
    pub temperature: Option<f64>,

    /// Maximum tokens to generate (omitted from the wire when unset)
    pub max_tokens: Option<u32>,

    /// Whether to request an SSE stream
    pub stream: bool,
}

impl ChatCompletionOptions {
    /// Create options for a model and conversation
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable or disable streaming
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Wire payload for `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl<'a> RequestBody<'a> {
    /// Build the payload, applying wire defaults
    pub fn from_options(options: &'a ChatCompletionOptions) -> Self {
        Self {
            model: &options.model,
            messages: &options.messages,
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: options.max_tokens,
            stream: options.stream,
        }
    }

    /// Override the stream flag for the calling mode
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Build the JSON wire payload for a set of options
pub fn build_request(options: &ChatCompletionOptions) -> serde_json::Value {
    // Strings and numbers only; converting to a Value cannot fail.
    serde_json::to_value(RequestBody::from_options(options)).unwrap_or(serde_json::Value::Null)
}

/// Treat an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a counter from whatever numeric shape the gateway sent
///
/// Floats, numeric strings and nulls are accepted; anything negative, out of
/// range or non-numeric falls back to zero.
fn lenient_count<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + TryFrom<u64>,
{
    let count = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(count.and_then(|n| T::try_from(n).ok()).unwrap_or_default())
}

/// Read a metadata string, stringifying numbers and booleans
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    })
}

/// Like [`lenient_string`], but absent instead of empty
fn lenient_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(lenient_string(deserializer)?).filter(|s| !s.is_empty()))
}

/// Usage block, or `None` when it is not an object of counters
fn lenient_usage<'de, D>(deserializer: D) -> std::result::Result<Option<Usage>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

/// Chat completion response
///
/// Only `choices[].message.content` is load-bearing. Metadata fields accept
/// loosely typed values and fall back to defaults instead of failing the
/// whole decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub object: String,

    /// Creation timestamp (unix seconds)
    #[serde(default, deserialize_with = "lenient_count")]
    pub created: u64,

    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,

    #[serde(
        default,
        deserialize_with = "lenient_usage",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage: Option<Usage>,
}

/// A choice in the completion response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default, deserialize_with = "lenient_count")]
    pub index: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub message: ResponseMessage,

    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub finish_reason: Option<String>,
}

/// The assistant message inside a choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_tokens: u32,

    #[serde(default, deserialize_with = "lenient_count")]
    pub completion_tokens: u32,

    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tokens: u32,
}

impl ChatCompletionResponse {
    /// Content of the first choice, or `""` when there is none
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default()
    }

    /// Finish reason of the first choice
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

/// Decode a complete (non-streaming) response body
pub fn decode_response(body: &str) -> Result<ChatCompletionResponse> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_temperature_defaults_when_absent() {
        let options = ChatCompletionOptions::new("openai/gpt-4o-mini", vec![ChatMessage::user("hi")]);
        let payload = build_request(&options);

        assert_eq!(payload["temperature"], 0.7);
        assert_eq!(payload["stream"], false);
        assert!(payload.get("max_tokens").is_none());
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let options = ChatCompletionOptions::new("m", vec![ChatMessage::user("hi")])
            .with_temperature(0.2)
            .with_max_tokens(64)
            .with_stream(true);
        let payload = build_request(&options);

        assert_eq!(payload["temperature"], 0.2);
        assert_eq!(payload["max_tokens"], 64);
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["model"], "m");
    }

    #[test]
    fn test_message_order_preserved() {
        let options = ChatCompletionOptions::new(
            "m",
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("first"),
                ChatMessage::assistant("reply"),
                ChatMessage::user("second"),
            ],
        );
        let payload = build_request(&options);

        assert_eq!(
            payload["messages"],
            serde_json::json!([
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "reply"},
                {"role": "user", "content": "second"}
            ])
        );
    }

    #[test]
    fn test_streaming_override() {
        let options = ChatCompletionOptions::new("m", vec![]);
        let body = RequestBody::from_options(&options).streaming(true);
        assert!(body.stream);
    }

    #[test]
    fn test_completion_response_deserialization() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1677652288,
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello!"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15
            }
        }"#;

        let response = decode_response(json).unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.content(), "Hello!");
        assert_eq!(response.finish_reason(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_partial_response_degrades_to_defaults() {
        let json = r#"{
            "id": "chatcmpl-456",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": null},
                "finish_reason": null
            }]
        }"#;

        let response = decode_response(json).unwrap();
        assert_eq!(response.content(), "");
        assert_eq!(response.finish_reason(), None);
        assert_eq!(response.created, 0);
        assert!(response.usage.is_none());

        let response = decode_response(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert_eq!(response.content(), "");

        let response = decode_response("{}").unwrap();
        assert!(response.choices.is_empty());
        assert_eq!(response.content(), "");
    }

    #[test]
    fn test_null_usage_counters_keep_content() {
        let json = r#"{
            "id": "chatcmpl-789",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "kept"}}],
            "usage": {"prompt_tokens": null, "completion_tokens": 4, "total_tokens": null}
        }"#;

        let response = decode_response(json).unwrap();
        assert_eq!(response.content(), "kept");
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_tokens: 0,
                completion_tokens: 4,
                total_tokens: 0,
            })
        );
    }

    #[test]
    fn test_loosely_typed_metadata_keeps_content() {
        let json = r#"{
            "id": 42,
            "object": null,
            "created": 1700000000.0,
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "index": "0",
                "message": {"role": 1, "content": "still here"},
                "finish_reason": 0
            }],
            "usage": {"prompt_tokens": 3.0, "completion_tokens": -1, "total_tokens": "7"}
        }"#;

        let response = decode_response(json).unwrap();
        assert_eq!(response.content(), "still here");
        assert_eq!(response.id, "42");
        assert_eq!(response.object, "");
        assert_eq!(response.created, 1_700_000_000);
        assert_eq!(response.choices[0].index, 0);
        assert_eq!(response.finish_reason(), Some("0"));

        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 3);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 7);
    }

    #[test]
    fn test_non_object_usage_is_dropped() {
        let response =
            decode_response(r#"{"choices":[{"message":{"content":"ok"}}],"usage":"n/a"}"#).unwrap();
        assert_eq!(response.content(), "ok");
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_non_json_body_is_decode_error() {
        let err = decode_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }
}
