use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::parts::ToolCall;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Tool name to declared tool. Absent and empty are equivalent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, ToolSpec>,
}

impl ChatRequest {
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system: None,
            tools: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Tool declarations reshaped for the upstream model call, in name order.
    #[must_use]
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|(name, spec)| ToolDefinition {
                name: name.clone(),
                parameters: spec.parameters_schema(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: MessageContent,
    /// Tool calls attached to an assistant turn by the UI layer.
    #[serde(
        default,
        rename = "toolInvocations",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_invocations: Vec<ToolInvocation>,
}

impl ChatMessage {
    #[must_use]
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
            tool_invocations: Vec::new(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(ChatRole::User, text)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, text)
    }

    #[must_use]
    pub fn with_tool_invocation(mut self, invocation: ToolInvocation) -> Self {
        self.tool_invocations.push(invocation);
        self
    }

    /// Text content with non-text parts dropped.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Completed tool calls, from `tool-call` parts then from invocations.
    ///
    /// Invocations still waiting on a result are left out: a replayed call without its answer
    /// is rejected upstream.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        let from_parts = self.parts().iter().filter_map(|part| match part {
            ContentPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => Some(ToolCall {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                args: args.clone(),
            }),
            _ => None,
        });
        let from_invocations = self
            .tool_invocations
            .iter()
            .filter(|invocation| invocation.result.is_some())
            .map(|invocation| ToolCall {
                tool_call_id: invocation.tool_call_id.clone(),
                tool_name: invocation.tool_name.clone(),
                args: invocation.args.clone(),
            });
        from_parts.chain(from_invocations).collect()
    }

    /// Tool results, from `tool-result` parts then from finished invocations.
    #[must_use]
    pub fn tool_results(&self) -> Vec<ToolResult> {
        let from_parts = self.parts().iter().filter_map(|part| match part {
            ContentPart::ToolResult {
                tool_call_id,
                tool_name,
                result,
            } => Some(ToolResult {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                result: result.clone(),
            }),
            _ => None,
        });
        let from_invocations = self.tool_invocations.iter().filter_map(|invocation| {
            invocation.result.as_ref().map(|result| ToolResult {
                tool_call_id: invocation.tool_call_id.clone(),
                tool_name: invocation.tool_name.clone(),
                result: result.clone(),
            })
        });
        from_parts.chain(from_invocations).collect()
    }

    fn parts(&self) -> &[ContentPart] {
        match &self.content {
            MessageContent::Text(_) => &[],
            MessageContent::Parts(parts) => parts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        result: Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolInvocationState {
    PartialCall,
    #[default]
    Call,
    Result,
}

/// One tool call tracked on an assistant message, with its result once the tool has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    #[serde(default)]
    pub state: ToolInvocationState,
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolInvocation {
    #[must_use]
    pub fn completed(call: ToolCall, result: Value) -> Self {
        Self {
            state: ToolInvocationState::Result,
            tool_call_id: call.tool_call_id,
            tool_name: call.tool_name,
            args: call.args,
            result: Some(result),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: Value,
}

/// A tool as declared by the caller. `parameters` is an opaque JSON schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolSpec {
    #[must_use]
    pub fn new(parameters: Value) -> Self {
        Self {
            description: None,
            parameters: Some(parameters),
        }
    }

    /// The declared schema when it is a JSON object, otherwise an empty object schema.
    #[must_use]
    pub fn parameters_schema(&self) -> Value {
        match &self.parameters {
            Some(schema @ Value::Object(_)) => schema.clone(),
            _ => empty_object_schema(),
        }
    }
}

/// Tool shape handed to the upstream model: a name and its parameter schema only.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub parameters: Value,
}

#[must_use]
pub fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}
