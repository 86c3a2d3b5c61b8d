//! Message snapshots produced by the streaming transport and block-level completion detection.

pub mod completion;
pub mod message;

pub use completion::{is_complete, CLOSING_FENCE};
pub use message::{Message, MessageId, MessageRole, MessageStatus};
