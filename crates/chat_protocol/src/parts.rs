//! Data stream v1 parts.
//!
//! Each part is one line: a type code, a colon, a JSON payload, and `\n`.
//!
//! | code | part            | payload                                          |
//! |------|-----------------|--------------------------------------------------|
//! | `f`  | message start   | `{"messageId"}`                                  |
//! | `0`  | text delta      | JSON string                                      |
//! | `9`  | tool call       | `{"toolCallId","toolName","args"}`               |
//! | `3`  | error           | JSON string                                      |
//! | `e`  | finish step     | `{"finishReason","usage","isContinued"}`         |
//! | `d`  | finish message  | `{"finishReason","usage"}`                       |

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ProtocolError;

pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";
pub const DATA_STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    Other,
    Unknown,
}

impl FinishReason {
    /// Maps an OpenAI-style `finish_reason`.
    #[must_use]
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }
}

/// Token counts. Missing counts travel as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    Start {
        message_id: String,
    },
    Text(String),
    ToolCall(ToolCall),
    Error(String),
    FinishStep {
        finish_reason: FinishReason,
        usage: Usage,
        is_continued: bool,
    },
    FinishMessage {
        finish_reason: FinishReason,
        usage: Usage,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPayload {
    message_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload {
    finish_reason: FinishReason,
    #[serde(default)]
    usage: Usage,
    #[serde(default)]
    is_continued: bool,
}

impl StreamPart {
    #[must_use]
    pub fn code(&self) -> char {
        match self {
            Self::Start { .. } => 'f',
            Self::Text(_) => '0',
            Self::ToolCall(_) => '9',
            Self::Error(_) => '3',
            Self::FinishStep { .. } => 'e',
            Self::FinishMessage { .. } => 'd',
        }
    }

    /// Encodes the part as one newline-terminated line.
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = match self {
            Self::Start { message_id } => json!({ "messageId": message_id }),
            Self::Text(text) | Self::Error(text) => Value::String(text.clone()),
            Self::ToolCall(call) => json!({
                "toolCallId": call.tool_call_id,
                "toolName": call.tool_name,
                "args": call.args,
            }),
            Self::FinishStep {
                finish_reason,
                usage,
                is_continued,
            } => json!({
                "finishReason": finish_reason,
                "usage": usage,
                "isContinued": is_continued,
            }),
            Self::FinishMessage {
                finish_reason,
                usage,
            } => json!({
                "finishReason": finish_reason,
                "usage": usage,
            }),
        };
        format!("{}:{}\n", self.code(), payload)
    }

    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::FinishMessage { .. })
    }
}

/// Parses one line, without its trailing newline.
pub fn parse_line(line: &str) -> Result<StreamPart, ProtocolError> {
    let Some((code, payload)) = line.split_once(':') else {
        return Err(ProtocolError::MissingCode {
            line: line.to_string(),
        });
    };

    match code {
        "f" => {
            let start: StartPayload = payload_of(code, payload)?;
            Ok(StreamPart::Start {
                message_id: start.message_id,
            })
        }
        "0" => Ok(StreamPart::Text(payload_of(code, payload)?)),
        "9" => Ok(StreamPart::ToolCall(payload_of(code, payload)?)),
        "3" => Ok(StreamPart::Error(payload_of(code, payload)?)),
        "e" => {
            let finish: FinishPayload = payload_of(code, payload)?;
            Ok(StreamPart::FinishStep {
                finish_reason: finish.finish_reason,
                usage: finish.usage,
                is_continued: finish.is_continued,
            })
        }
        "d" => {
            let finish: FinishPayload = payload_of(code, payload)?;
            Ok(StreamPart::FinishMessage {
                finish_reason: finish.finish_reason,
                usage: finish.usage,
            })
        }
        other => Err(ProtocolError::UnknownPart {
            code: other.to_string(),
        }),
    }
}

fn payload_of<T: DeserializeOwned>(code: &str, payload: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(payload).map_err(|source| ProtocolError::InvalidPayload {
        code: code.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{parse_line, FinishReason, StreamPart, ToolCall, Usage};
    use crate::ProtocolError;

    #[test]
    fn encodes_each_part_kind() {
        let usage = Usage {
            prompt_tokens: Some(12),
            completion_tokens: None,
        };
        assert_eq!(
            StreamPart::Start {
                message_id: "msg-1".to_string()
            }
            .encode(),
            "f:{\"messageId\":\"msg-1\"}\n"
        );
        assert_eq!(
            StreamPart::Text("say \"hi\"\n".to_string()).encode(),
            "0:\"say \\\"hi\\\"\\n\"\n"
        );
        assert_eq!(
            StreamPart::Error("upstream failed".to_string()).encode(),
            "3:\"upstream failed\"\n"
        );
        assert_eq!(
            StreamPart::FinishStep {
                finish_reason: FinishReason::ToolCalls,
                usage,
                is_continued: false,
            }
            .encode(),
            "e:{\"finishReason\":\"tool-calls\",\"isContinued\":false,\"usage\":{\"completionTokens\":null,\"promptTokens\":12}}\n"
        );
        assert_eq!(
            StreamPart::FinishMessage {
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            }
            .encode(),
            "d:{\"finishReason\":\"stop\",\"usage\":{\"completionTokens\":null,\"promptTokens\":null}}\n"
        );
    }

    #[test]
    fn tool_call_line_parses_back() {
        let call = StreamPart::ToolCall(ToolCall {
            tool_call_id: "call_0".to_string(),
            tool_name: "weather".to_string(),
            args: json!({ "city": "Oslo" }),
        });
        let line = call.encode();
        assert_eq!(parse_line(line.trim_end()).expect("parses"), call);
    }

    #[test]
    fn text_with_colons_keeps_payload_intact() {
        assert_eq!(
            parse_line("0:\"a: b\"").expect("parses"),
            StreamPart::Text("a: b".to_string())
        );
    }

    #[test]
    fn finish_without_usage_defaults_counts() {
        assert_eq!(
            parse_line("d:{\"finishReason\":\"length\"}").expect("parses"),
            StreamPart::FinishMessage {
                finish_reason: FinishReason::Length,
                usage: Usage::default(),
            }
        );
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            parse_line("no code here"),
            Err(ProtocolError::MissingCode { .. })
        ));
        assert!(matches!(
            parse_line("0:not json"),
            Err(ProtocolError::InvalidPayload { ref code, .. }) if code == "0"
        ));
        let unknown = parse_line("2:[{\"x\":1}]").expect_err("unknown code");
        assert!(unknown.is_skippable());
    }

    #[test]
    fn openai_finish_reasons_map() {
        assert_eq!(FinishReason::from_openai("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_openai("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(
            FinishReason::from_openai("content_filter"),
            FinishReason::ContentFilter
        );
        assert_eq!(FinishReason::from_openai("whatever"), FinishReason::Other);
    }
}
