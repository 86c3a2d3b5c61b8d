use serde_json::Value;

use crate::error::code_string;
use crate::events::OpenRouterStreamEvent;

/// Incremental parser for chat-completions SSE streams.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<OpenRouterStreamEvent> {
        self.buffer
            .extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));
        let mut events = Vec::new();

        while let Some(split) = self.buffer.windows(2).position(|pair| pair == b"\n\n") {
            let frame: Vec<u8> = self.buffer.drain(..split + 2).collect();
            let frame = String::from_utf8_lossy(&frame[..split]);

            let Some(payload) = extract_data_payload(&frame) else {
                continue;
            };
            if payload == "[DONE]" {
                continue;
            }
            match serde_json::from_str::<Value>(&payload) {
                Ok(value) => events.extend(map_chunk(&value)),
                Err(error) => tracing::debug!(%error, "skipping undecodable SSE frame"),
            }
        }

        events
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<OpenRouterStreamEvent> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

/// Joins `data:` lines. Comment lines (`: keep-alive`) and other fields are dropped.
fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn map_chunk(value: &Value) -> Vec<OpenRouterStreamEvent> {
    let mut events = Vec::new();

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("upstream error")
            .to_owned();
        events.push(OpenRouterStreamEvent::Error {
            code: code_string(error.get("code")),
            message,
        });
        return events;
    }

    if let Some(choice) = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    {
        let delta = choice.get("delta");

        if let Some(text) = delta
            .and_then(|delta| delta.get("content"))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            events.push(OpenRouterStreamEvent::TextDelta {
                delta: text.to_owned(),
            });
        }

        let tool_calls = delta
            .and_then(|delta| delta.get("tool_calls"))
            .and_then(Value::as_array);
        for (position, call) in tool_calls.into_iter().flatten().enumerate() {
            let function = call.get("function");
            events.push(OpenRouterStreamEvent::ToolCallDelta {
                index: call
                    .get("index")
                    .and_then(Value::as_u64)
                    .and_then(|index| usize::try_from(index).ok())
                    .unwrap_or(position),
                id: call.get("id").and_then(Value::as_str).map(ToString::to_string),
                name: function
                    .and_then(|function| function.get("name"))
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
                arguments: function
                    .and_then(|function| function.get("arguments"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_owned(),
            });
        }

        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            events.push(OpenRouterStreamEvent::Finish {
                reason: reason.to_owned(),
            });
        }
    }

    if let Some(usage) = value.get("usage").filter(|usage| usage.is_object()) {
        events.push(OpenRouterStreamEvent::Usage {
            prompt_tokens: usage.get("prompt_tokens").and_then(Value::as_u64),
            completion_tokens: usage.get("completion_tokens").and_then(Value::as_u64),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::SseStreamParser;
    use crate::events::OpenRouterStreamEvent;

    #[test]
    fn parse_sse_frames_incrementally() {
        let mut parser = SseStreamParser::default();
        let mut events = Vec::new();

        events.extend(parser.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel"));
        assert!(events.is_empty());
        events.extend(parser.feed(b"lo\"}}]}\r\n\r\n"));
        assert_eq!(
            events,
            vec![OpenRouterStreamEvent::TextDelta {
                delta: "Hello".to_string()
            }]
        );

        events.extend(parser.feed(b": OPENROUTER PROCESSING\n\ndata: [DONE]\n\n"));
        assert_eq!(events.len(), 1);
        assert!(parser.is_empty_buffer());
    }
}
