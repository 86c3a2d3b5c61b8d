//! Transport-only OpenRouter chat-completions client.
//!
//! Owns request building, SSE parsing and retry for the OpenAI-compatible
//! `/chat/completions` endpoint. Knows nothing about the data stream the proxy serves.
//!
//! Tool calls arrive as per-index argument fragments; [`ToolCallAccumulator`] joins them.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use client::{CancellationSignal, OpenRouterClient, StreamResult};
pub use config::OpenRouterConfig;
pub use error::OpenRouterError;
pub use events::{CompletedToolCall, OpenRouterStreamEvent, ToolCallAccumulator};
pub use payload::{
    ChatCompletionRequest, FunctionCall, FunctionTool, RequestMessage, RequestToolCall,
};
pub use sse::SseStreamParser;
pub use url::normalize_chat_completions_url;
