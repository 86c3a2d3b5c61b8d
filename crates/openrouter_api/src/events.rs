use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream event emitted by the parser after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenRouterStreamEvent {
    TextDelta {
        delta: String,
    },
    /// One fragment of a tool call. `id` and `name` usually arrive on the first fragment only.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: String,
    },
    Finish {
        reason: String,
    },
    Usage {
        prompt_tokens: Option<u64>,
        completion_tokens: Option<u64>,
    },
    Error {
        code: Option<String>,
        message: String,
    },
}

/// A tool call with all fragments joined.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedToolCall {
    pub id: String,
    pub name: String,
    /// Parsed arguments; text that is not valid JSON is kept as a string.
    pub arguments: Value,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Joins tool-call fragments by index until the choice finishes.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: BTreeMap<usize, PendingToolCall>,
}

impl ToolCallAccumulator {
    pub fn push(&mut self, index: usize, id: Option<&str>, name: Option<&str>, arguments: &str) {
        let call = self.pending.entry(index).or_default();
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            call.id = Some(id.to_owned());
        }
        if let Some(name) = name {
            call.name.push_str(name);
        }
        call.arguments.push_str(arguments);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Completed calls in index order. Calls without an upstream id get `call_{index}`.
    pub fn drain(&mut self) -> Vec<CompletedToolCall> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(index, call)| {
                let raw = call.arguments.trim();
                let arguments = if raw.is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
                };
                CompletedToolCall {
                    id: call.id.unwrap_or_else(|| format!("call_{index}")),
                    name: call.name,
                    arguments,
                }
            })
            .collect()
    }
}
