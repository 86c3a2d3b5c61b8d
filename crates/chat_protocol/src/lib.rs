//! Wire contract shared by the chat proxy and the terminal client.
//!
//! Covers the `POST /api/chat` request body, the line-oriented data stream the proxy answers
//! with, and the run lifecycle the client drives from that stream. Transport lives elsewhere.

mod decoder;
mod error;
mod parts;
mod request;
mod run;

pub use decoder::DataStreamDecoder;
pub use error::ProtocolError;
pub use parts::{
    parse_line, FinishReason, StreamPart, ToolCall, Usage, DATA_STREAM_CONTENT_TYPE,
    DATA_STREAM_HEADER, DATA_STREAM_VERSION,
};
pub use request::{
    empty_object_schema, ChatMessage, ChatRequest, ChatRole, ContentPart, MessageContent,
    ToolDefinition, ToolInvocation, ToolInvocationState, ToolResult, ToolSpec,
};
pub use run::{CancelSignal, ChatTransport, RunEvent, RunId};
