//! Terminal chat UI core with live diagram rendering.
//!
//! Assistant messages stream in as growing text snapshots. Each snapshot is parsed as
//! markdown; fenced diagram blocks are checked with [`is_complete`] and handed to a
//! [`DiagramRenderer`] through [`RenderStaging`] exactly once per completed content.
//!
//! # Public API Overview
//! - [`ThreadView`] and [`Markdown`] render transcripts to terminal lines.
//! - [`RenderStaging`] drives a single block's render lifecycle.
//! - [`diagram::initialize`] installs the process-wide diagram engine configuration.
//! - [`CopyToClipboard`] tracks the copied indicator for code blocks.

pub mod clipboard;
pub mod config;
pub mod core;
pub mod diagram;
pub mod logging;
pub mod render;
pub mod stream;
pub mod widgets;

pub use crate::clipboard::{
    Clipboard, ClipboardError, CopyToClipboard, Osc52Clipboard, DEFAULT_COPIED_DURATION,
};
pub use crate::config::UiConfig;
pub use crate::core::component::Component;
pub use crate::diagram::{
    DiagramConfig, DiagramError, DiagramRenderer, DiagramTheme, MermaidRenderer,
};
pub use crate::render::{
    InlineExecutor, RenderExecutor, RenderNode, RenderRegion, RenderStaging, RenderTarget,
    StageState, ThreadExecutor, PLACEHOLDER,
};
pub use crate::stream::{is_complete, Message, MessageId, MessageRole, MessageStatus};
pub use crate::widgets::{
    prewarm_code_highlighting, CodeHeader, DiagramBlock, DiagramSupport, Markdown,
    MarkdownTheme, ThreadTheme, ThreadView,
};
