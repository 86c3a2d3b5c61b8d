//! Block-level completion detection for fenced content inside a streaming message.
//!
//! The transport only reports whether a whole message is still running. A fenced diagram
//! block can finish long before the message does, so completion is derived from the text:
//! a block is complete once its literal body is immediately followed by the closing fence.
//!
//! Matching is anchored at the first occurrence of the block body. When the same body
//! appears twice, the second block inherits the first block's answer.

/// Closing delimiter of a fenced code block.
pub const CLOSING_FENCE: &str = "```";

/// Returns whether `block` has been fully emitted inside `full_text`.
///
/// The text right after the first occurrence of `block` must start with [`CLOSING_FENCE`],
/// optionally preceded by a single `\n`. An empty `block` is never complete.
pub fn is_complete(full_text: &str, block: &str) -> bool {
    if block.is_empty() {
        return false;
    }

    let Some(start) = full_text.find(block) else {
        return false;
    };

    let after = &full_text[start + block.len()..];
    let after = after.strip_prefix('\n').unwrap_or(after);
    after.starts_with(CLOSING_FENCE)
}
