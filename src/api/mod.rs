//! API Module
//!
//! Chat completion wire types and SSE frame decoding.

pub mod completion;
pub mod streaming;

pub use completion::{
    build_request, decode_response, ChatCompletionOptions, ChatCompletionResponse, ChatMessage,
    Choice, RequestBody, ResponseMessage, Role, Usage, DEFAULT_TEMPERATURE,
};
pub use streaming::{delta_content, parse_sse_line, SseDecoder, SseLine};
