//! Client Module
//!
//! Request building, transport, response decoding and the stream reader.

pub mod http;
pub mod request;
pub mod response;
pub mod stream;

pub use http::HttpClient;
pub use request::RequestBuilder;
pub use response::{api_error, decode_json, default_error_message};
pub use stream::{ChatCompletionStream, EventStream, FimCompletionStream};
