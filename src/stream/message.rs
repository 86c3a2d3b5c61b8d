//! Read-only message snapshots.

use std::fmt;

/// Stable message identifier assigned by the transport.
pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse transport status for a whole message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Running,
    Complete,
    Failed(String),
}

impl MessageStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// One transcript entry. The text only ever grows while the status is [`MessageStatus::Running`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub text: String,
    pub status: MessageStatus,
}

impl Message {
    pub fn new(id: MessageId, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            status: MessageStatus::Complete,
        }
    }

    /// Creates an empty assistant message that is still being streamed.
    pub fn streaming(id: MessageId) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            text: String::new(),
            status: MessageStatus::Running,
        }
    }

    /// Appends a streamed chunk. Chunks arriving after completion are ignored.
    pub fn append(&mut self, chunk: &str) {
        if self.status.is_running() {
            self.text.push_str(chunk);
        }
    }

    pub fn finish(&mut self) {
        if self.status.is_running() {
            self.status = MessageStatus::Complete;
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_running() {
            self.status = MessageStatus::Failed(error.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, MessageRole, MessageStatus};

    #[test]
    fn streaming_message_grows_until_finished() {
        let mut message = Message::streaming(7);
        message.append("```mermaid\n");
        message.append("graph TD");
        message.finish();
        message.append("late");

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text, "```mermaid\ngraph TD");
        assert_eq!(message.status, MessageStatus::Complete);
    }

    #[test]
    fn failure_is_terminal() {
        let mut message = Message::streaming(1);
        message.fail("upstream closed");
        message.finish();
        assert_eq!(
            message.status,
            MessageStatus::Failed("upstream closed".to_string())
        );
    }
}
