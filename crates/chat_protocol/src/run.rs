use std::sync::{atomic::AtomicBool, Arc};

use crate::{ChatRequest, FinishReason, StreamPart, ToolCall};

/// Identifier for one request/response exchange.
pub type RunId = u64;

/// Shared cancellation flag for a run.
pub type CancelSignal = Arc<AtomicBool>;

/// Client-side lifecycle event for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started { run_id: RunId },
    Chunk { run_id: RunId, text: String },
    ToolCall { run_id: RunId, call: ToolCall },
    Finished { run_id: RunId, reason: FinishReason },
    Failed { run_id: RunId, error: String },
    Cancelled { run_id: RunId },
}

impl RunEvent {
    #[must_use]
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Started { run_id }
            | Self::Chunk { run_id, .. }
            | Self::ToolCall { run_id, .. }
            | Self::Finished { run_id, .. }
            | Self::Failed { run_id, .. }
            | Self::Cancelled { run_id } => *run_id,
        }
    }

    /// Returns true when this event terminates the run lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    /// Lifts a decoded stream part into a run event. Step boundaries carry no event.
    #[must_use]
    pub fn from_part(run_id: RunId, part: StreamPart) -> Option<Self> {
        match part {
            StreamPart::Start { .. } => Some(Self::Started { run_id }),
            StreamPart::Text(text) => Some(Self::Chunk { run_id, text }),
            StreamPart::ToolCall(call) => Some(Self::ToolCall { run_id, call }),
            StreamPart::Error(error) => Some(Self::Failed { run_id, error }),
            StreamPart::FinishMessage { finish_reason, .. } => Some(Self::Finished {
                run_id,
                reason: finish_reason,
            }),
            StreamPart::FinishStep { .. } => None,
        }
    }
}

/// Sends a chat request and reports the streamed reply as run events.
pub trait ChatTransport: Send + Sync + 'static {
    /// Short human-readable endpoint description.
    fn describe(&self) -> String;

    /// Executes one request, emitting events in stream order. Implementations emit exactly one
    /// terminal event unless they return `Err`.
    fn run(
        &self,
        run_id: RunId,
        request: ChatRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), String>;
}
