//! Client Module
//!
//! HTTP transport and the fragment stream over response bodies.

pub mod http;
pub mod stream;

pub use http::HttpClient;
pub use stream::{ByteStream, FragmentStream, ResponseStream, StreamState};
