//! Outbound calls to the hosted style-advisor model.

use async_trait::async_trait;

mod error;
mod http;
mod parse;
pub mod prompts;
mod request;

pub use error::{LlmError, LlmErrorKind};
pub use http::HttpLlmClient;
pub use parse::{
    parse_structured_response, strip_code_fences, try_parse_structured, ParseError, Validate,
};
pub use request::{ContentBlock, ImageSource, LlmRequest, LlmResponse, Message, MessageContent, Role};

/// A completion backend. Returns the text of the first content block.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError>;
}
