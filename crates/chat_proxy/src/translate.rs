//! Upstream request shaping and OpenRouter event to data-stream part translation.

use chat_protocol::{
    ChatMessage, ChatRequest, ChatRole, FinishReason, StreamPart, ToolCall, ToolResult, Usage,
};
use openrouter_api::{
    ChatCompletionRequest, FunctionTool, OpenRouterStreamEvent, RequestMessage,
    RequestToolCall, ToolCallAccumulator,
};
use serde_json::Value;

/// Builds the upstream completion request: the system prompt first, then the message history,
/// then each declared tool as a function with its coerced parameter schema.
pub fn upstream_request(model: &str, request: &ChatRequest) -> ChatCompletionRequest {
    let system = request
        .system
        .as_deref()
        .filter(|system| !system.trim().is_empty())
        .map(|system| RequestMessage::new("system", system));
    let messages = system
        .into_iter()
        .chain(request.messages.iter().flat_map(upstream_messages))
        .collect();
    let tools = request
        .tool_definitions()
        .into_iter()
        .map(|tool| FunctionTool::new(tool.name, tool.parameters))
        .collect();

    ChatCompletionRequest::new(model, messages).with_tools(tools)
}

/// One history message as upstream messages. An assistant turn that called tools becomes the
/// call message followed by one `tool` message per answered call.
fn upstream_messages(message: &ChatMessage) -> Vec<RequestMessage> {
    match message.role {
        ChatRole::Assistant => {
            let calls = message.tool_calls();
            if calls.is_empty() {
                return vec![RequestMessage::new("assistant", message.plain_text())];
            }
            let calls = calls
                .iter()
                .map(|call| RequestToolCall::function(&call.tool_call_id, &call.tool_name, &call.args))
                .collect();
            std::iter::once(RequestMessage::assistant_tool_calls(message.plain_text(), calls))
                .chain(message.tool_results().iter().map(tool_message))
                .collect()
        }
        ChatRole::Tool => {
            let results = message.tool_results();
            if results.is_empty() {
                tracing::warn!("dropping tool message without a tool result");
            }
            results.iter().map(tool_message).collect()
        }
        ChatRole::System | ChatRole::User => {
            vec![RequestMessage::new(message.role.as_str(), message.plain_text())]
        }
    }
}

fn tool_message(result: &ToolResult) -> RequestMessage {
    let content = match &result.result {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    RequestMessage::tool_result(&result.tool_call_id, content)
}

/// Turns one upstream stream into data-stream parts.
#[derive(Debug)]
pub struct StreamTranslator {
    message_id: String,
    tool_calls: ToolCallAccumulator,
    emitted_tool_call: bool,
    finish_reason: Option<FinishReason>,
    usage: Usage,
}

impl StreamTranslator {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            tool_calls: ToolCallAccumulator::default(),
            emitted_tool_call: false,
            finish_reason: None,
            usage: Usage::default(),
        }
    }

    pub fn start(&self) -> StreamPart {
        StreamPart::Start {
            message_id: self.message_id.clone(),
        }
    }

    pub fn on_event(&mut self, event: OpenRouterStreamEvent) -> Vec<StreamPart> {
        match event {
            OpenRouterStreamEvent::TextDelta { delta } => vec![StreamPart::Text(delta)],
            OpenRouterStreamEvent::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => {
                self.tool_calls
                    .push(index, id.as_deref(), name.as_deref(), &arguments);
                Vec::new()
            }
            OpenRouterStreamEvent::Finish { reason } => {
                self.finish_reason = Some(FinishReason::from_openai(&reason));
                self.flush_tool_calls()
            }
            OpenRouterStreamEvent::Usage {
                prompt_tokens,
                completion_tokens,
            } => {
                self.usage = Usage {
                    prompt_tokens,
                    completion_tokens,
                };
                Vec::new()
            }
            OpenRouterStreamEvent::Error { message, .. } => vec![StreamPart::Error(message)],
        }
    }

    /// Closing parts for a stream that ended normally.
    pub fn finish(mut self) -> Vec<StreamPart> {
        let mut parts = self.flush_tool_calls();
        let finish_reason = self.finish_reason.unwrap_or(if self.emitted_tool_call {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        });
        parts.push(StreamPart::FinishStep {
            finish_reason,
            usage: self.usage,
            is_continued: false,
        });
        parts.push(StreamPart::FinishMessage {
            finish_reason,
            usage: self.usage,
        });
        parts
    }

    /// Closing part for a stream that failed. The upstream message is forwarded as is.
    pub fn fail(self, error: impl std::fmt::Display) -> Vec<StreamPart> {
        vec![StreamPart::Error(error.to_string())]
    }

    fn flush_tool_calls(&mut self) -> Vec<StreamPart> {
        let calls = self.tool_calls.drain();
        self.emitted_tool_call |= !calls.is_empty();
        calls
            .into_iter()
            .map(|call| {
                StreamPart::ToolCall(ToolCall {
                    tool_call_id: call.id,
                    tool_name: call.name,
                    args: call.arguments,
                })
            })
            .collect()
    }
}
