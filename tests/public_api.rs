#![allow(unused_imports)]

use diagram_chat::core::text::width::{truncate_to_width, visible_width};
use diagram_chat::core::text::wrap::wrap_text_with_ansi;
use diagram_chat::diagram::{config, initialize, Flowchart, Glyphs};
use diagram_chat::logging::{default_directives, initialize_logging};
use diagram_chat::widgets::{highlight_code, DefaultTextStyle};
use diagram_chat::{
    is_complete, prewarm_code_highlighting, Clipboard, ClipboardError, CodeHeader, Component,
    CopyToClipboard, DiagramBlock, DiagramConfig, DiagramError, DiagramRenderer, DiagramSupport,
    DiagramTheme, InlineExecutor, Markdown, MarkdownTheme, MermaidRenderer, Message, MessageId,
    MessageRole, MessageStatus, Osc52Clipboard, RenderExecutor, RenderNode, RenderRegion,
    RenderStaging, RenderTarget, StageState, ThreadExecutor, ThreadTheme, ThreadView, UiConfig,
    DEFAULT_COPIED_DURATION, PLACEHOLDER,
};

#[test]
fn public_api_exports_compile() {}
