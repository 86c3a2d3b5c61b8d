//! Widgets for the chat transcript.

pub mod code_header;
pub mod diagram_block;
pub mod highlight;
pub mod markdown;
pub mod thread;

pub use code_header::CodeHeader;
pub use diagram_block::DiagramBlock;
pub use highlight::{highlight_code, prewarm_code_highlighting};
pub use markdown::{DefaultTextStyle, DiagramSupport, Markdown, MarkdownTheme};
pub use thread::{ThreadTheme, ThreadView};
