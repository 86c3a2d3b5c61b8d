//! Markdown widget for chat messages.
//!
//! Fenced code blocks are routed by language: languages registered through
//! [`DiagramSupport`] become [`DiagramBlock`]s that render once their closing fence arrives,
//! every other block gets a [`CodeHeader`] and a (optionally highlighted) body.

use std::sync::Arc;
use std::time::{Duration, Instant};

use markdown::{mdast, to_mdast, ParseOptions};

use super::code_header::CodeHeader;
use super::diagram_block::DiagramBlock;
use crate::clipboard::{Clipboard, ClipboardError, DEFAULT_COPIED_DURATION};
use crate::core::component::Component;
use crate::core::text::width::{pad_to_width, visible_width};
use crate::core::text::wrap::wrap_text_with_ansi;
use crate::diagram::{DiagramRenderer, MermaidRenderer};
use crate::render::{RenderExecutor, ThreadExecutor, PLACEHOLDER};

pub type MarkdownStyleFn = Box<dyn Fn(&str) -> String>;

pub type MarkdownCodeHighlighterFn = Box<dyn Fn(&str, Option<&str>) -> Vec<String>>;

pub struct DefaultTextStyle {
    pub color: Option<MarkdownStyleFn>,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
}

pub struct MarkdownTheme {
    pub heading: MarkdownStyleFn,
    pub link: MarkdownStyleFn,
    pub link_url: MarkdownStyleFn,
    pub code: MarkdownStyleFn,
    pub code_block: MarkdownStyleFn,
    pub code_header: MarkdownStyleFn,
    pub quote: MarkdownStyleFn,
    pub quote_border: MarkdownStyleFn,
    pub hr: MarkdownStyleFn,
    pub list_bullet: MarkdownStyleFn,
    pub bold: MarkdownStyleFn,
    pub italic: MarkdownStyleFn,
    pub strikethrough: MarkdownStyleFn,
    pub underline: MarkdownStyleFn,
    pub highlight_code: Option<MarkdownCodeHighlighterFn>,
    pub code_block_indent: Option<String>,
}

impl MarkdownTheme {
    /// Theme that leaves every span untouched.
    pub fn plain() -> Self {
        fn same(text: &str) -> String {
            text.to_string()
        }
        Self {
            heading: Box::new(same),
            link: Box::new(same),
            link_url: Box::new(same),
            code: Box::new(same),
            code_block: Box::new(same),
            code_header: Box::new(same),
            quote: Box::new(same),
            quote_border: Box::new(same),
            hr: Box::new(same),
            list_bullet: Box::new(same),
            bold: Box::new(same),
            italic: Box::new(same),
            strikethrough: Box::new(same),
            underline: Box::new(same),
            highlight_code: None,
            code_block_indent: None,
        }
    }
}

/// Languages whose fenced blocks are drawn as diagrams, and what draws them.
#[derive(Clone)]
pub struct DiagramSupport {
    languages: Vec<String>,
    renderer: Arc<dyn DiagramRenderer>,
    executor: Arc<dyn RenderExecutor>,
}

impl DiagramSupport {
    pub fn new(renderer: Arc<dyn DiagramRenderer>, executor: Arc<dyn RenderExecutor>) -> Self {
        Self {
            languages: vec!["mermaid".to_string()],
            renderer,
            executor,
        }
    }

    /// Mermaid blocks through the process-wide engine config, rendered on worker threads.
    pub fn mermaid() -> Self {
        Self::new(Arc::new(MermaidRenderer::new()), Arc::new(ThreadExecutor))
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    pub fn handles(&self, language: Option<&str>) -> bool {
        language.is_some_and(|language| {
            self.languages
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(language))
        })
    }
}

#[derive(Clone, Copy)]
enum InlineStyleKind {
    Default,
    Quote,
}

struct InlineStyleContext {
    kind: InlineStyleKind,
    style_prefix: String,
}

struct CodeBlockRef {
    lang: Option<String>,
    value: String,
}

pub struct Markdown {
    text: String,
    padding_x: usize,
    padding_y: usize,
    default_text_style: Option<DefaultTextStyle>,
    theme: MarkdownTheme,
    default_style_prefix: Option<String>,
    cached_text: Option<String>,
    cached_width: Option<usize>,
    cached_lines: Option<Vec<String>>,
    diagrams: Option<DiagramSupport>,
    diagram_blocks: Vec<DiagramBlock>,
    code_headers: Vec<CodeHeader>,
    copied_duration: Duration,
    copied_snapshot: Vec<bool>,
    diagram_cursor: usize,
    code_cursor: usize,
}

impl Markdown {
    pub fn new(
        text: impl Into<String>,
        padding_x: usize,
        padding_y: usize,
        theme: MarkdownTheme,
        default_text_style: Option<DefaultTextStyle>,
    ) -> Self {
        let mut markdown = Self {
            text: text.into(),
            padding_x,
            padding_y,
            default_text_style,
            theme,
            default_style_prefix: None,
            cached_text: None,
            cached_width: None,
            cached_lines: None,
            diagrams: None,
            diagram_blocks: Vec::new(),
            code_headers: Vec::new(),
            copied_duration: DEFAULT_COPIED_DURATION,
            copied_snapshot: Vec::new(),
            diagram_cursor: 0,
            code_cursor: 0,
        };
        markdown.sync_blocks();
        markdown
    }

    pub fn with_diagrams(mut self, diagrams: DiagramSupport) -> Self {
        self.diagrams = Some(diagrams);
        self.sync_blocks();
        self
    }

    pub fn with_copied_duration(mut self, copied_duration: Duration) -> Self {
        self.copied_duration = copied_duration;
        self.code_headers.clear();
        self.sync_blocks();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the source text and re-evaluates completion of every block against it.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.text {
            return;
        }
        self.text = text;
        self.invalidate();
        self.sync_blocks();
    }

    pub fn diagram_blocks(&self) -> &[DiagramBlock] {
        &self.diagram_blocks
    }

    pub fn code_block_count(&self) -> usize {
        self.code_headers.len()
    }

    /// Copies the `index`-th non-diagram code block.
    pub fn copy_code_block(
        &mut self,
        index: usize,
        clipboard: &mut dyn Clipboard,
    ) -> Result<bool, ClipboardError> {
        let Some(header) = self.code_headers.get_mut(index) else {
            return Ok(false);
        };
        let copied = header.on_copy(clipboard)?;
        if copied {
            self.invalidate();
        }
        Ok(copied)
    }

    /// Applies finished diagram renders and copy-indicator expiry. Returns `true` when the
    /// next render will differ.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for block in &mut self.diagram_blocks {
            changed |= block.poll();
        }

        let copied: Vec<bool> = self.code_headers.iter().map(CodeHeader::is_copied).collect();
        if copied != self.copied_snapshot {
            self.copied_snapshot = copied;
            changed = true;
        }

        if changed {
            self.invalidate();
        }
        changed
    }

    /// Detaches every diagram block from its in-flight render.
    pub fn teardown(&mut self) {
        for block in &mut self.diagram_blocks {
            block.teardown();
        }
    }

    fn sync_blocks(&mut self) {
        let blocks = match to_mdast(&self.text, &ParseOptions::gfm()) {
            Ok(mdast::Node::Root(root)) => {
                let mut blocks = Vec::new();
                collect_code_blocks(&root.children, &mut blocks);
                blocks
            }
            _ => Vec::new(),
        };

        let mut diagram_count = 0usize;
        let mut code_count = 0usize;
        for block in blocks {
            let is_diagram = self
                .diagrams
                .as_ref()
                .is_some_and(|diagrams| diagrams.handles(block.lang.as_deref()));

            if is_diagram {
                if diagram_count == self.diagram_blocks.len() {
                    if let Some(diagrams) = self.diagrams.as_ref() {
                        self.diagram_blocks.push(DiagramBlock::new(
                            block.lang.clone().unwrap_or_default(),
                            Arc::clone(&diagrams.renderer),
                            Arc::clone(&diagrams.executor),
                        ));
                    }
                }
                if let Some(diagram) = self.diagram_blocks.get_mut(diagram_count) {
                    diagram.sync(&self.text, &block.value);
                }
                diagram_count += 1;
            } else {
                match self.code_headers.get_mut(code_count) {
                    Some(header) => header.set_code(block.lang.as_deref(), &block.value),
                    None => self.code_headers.push(CodeHeader::new(
                        block.lang.as_deref(),
                        block.value,
                        self.copied_duration,
                    )),
                }
                code_count += 1;
            }
        }

        // Dropping a block tears down its staging.
        self.diagram_blocks.truncate(diagram_count);
        self.code_headers.truncate(code_count);
        self.copied_snapshot.resize(code_count, false);
    }

    fn apply_text_style(&self, text: &str) -> String {
        let Some(style) = self.default_text_style.as_ref() else {
            return text.to_string();
        };

        let mut styled = match style.color.as_ref() {
            Some(color) => color(text),
            None => text.to_string(),
        };
        for (enabled, apply) in [
            (style.bold, &self.theme.bold),
            (style.italic, &self.theme.italic),
            (style.strikethrough, &self.theme.strikethrough),
            (style.underline, &self.theme.underline),
        ] {
            if enabled {
                styled = apply(&styled);
            }
        }
        styled
    }

    fn default_prefix(&mut self) -> String {
        if let Some(prefix) = self.default_style_prefix.as_ref() {
            return prefix.clone();
        }
        let prefix = style_prefix_of(|text| self.apply_text_style(text));
        self.default_style_prefix = Some(prefix.clone());
        prefix
    }

    fn apply_inline_style(&self, text: &str, kind: InlineStyleKind) -> String {
        text.split('\n')
            .map(|segment| match kind {
                InlineStyleKind::Default => self.apply_text_style(segment),
                InlineStyleKind::Quote => (self.theme.quote)(&(self.theme.italic)(segment)),
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn default_inline_context(&mut self) -> InlineStyleContext {
        InlineStyleContext {
            kind: InlineStyleKind::Default,
            style_prefix: self.default_prefix(),
        }
    }

    fn render_inline_nodes(&self, nodes: &[mdast::Node], context: &InlineStyleContext) -> String {
        let style_prefix = context.style_prefix.as_str();
        let mut result = String::new();

        for node in nodes {
            match node {
                mdast::Node::Text(text) => {
                    result.push_str(&self.apply_inline_style(&text.value, context.kind));
                }
                mdast::Node::Paragraph(paragraph) => {
                    result.push_str(&self.render_inline_nodes(&paragraph.children, context));
                }
                mdast::Node::Strong(strong) => {
                    let content = self.render_inline_nodes(&strong.children, context);
                    result.push_str(&(self.theme.bold)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::Emphasis(emphasis) => {
                    let content = self.render_inline_nodes(&emphasis.children, context);
                    result.push_str(&(self.theme.italic)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::Delete(delete) => {
                    let content = self.render_inline_nodes(&delete.children, context);
                    result.push_str(&(self.theme.strikethrough)(&content));
                    result.push_str(style_prefix);
                }
                mdast::Node::InlineCode(code) => {
                    result.push_str(&(self.theme.code)(&code.value));
                    result.push_str(style_prefix);
                }
                mdast::Node::Link(link) => {
                    let label = self.render_inline_nodes(&link.children, context);
                    result.push_str(&(self.theme.link)(&(self.theme.underline)(&label)));

                    let plain = plain_text(&link.children);
                    let href = link.url.as_str();
                    let bare_href = href.strip_prefix("mailto:").unwrap_or(href);
                    if plain != href && plain != bare_href {
                        result.push_str(&(self.theme.link_url)(&format!(" ({href})")));
                    }
                    result.push_str(style_prefix);
                }
                mdast::Node::Break(_) => result.push('\n'),
                mdast::Node::Html(html) => {
                    result.push_str(&self.apply_inline_style(&html.value, context.kind));
                }
                mdast::Node::Image(image) => {
                    let alt = if image.alt.is_empty() {
                        image.url.as_str()
                    } else {
                        image.alt.as_str()
                    };
                    result.push_str(&self.apply_inline_style(alt, context.kind));
                }
                mdast::Node::InlineMath(math) => {
                    result.push_str(&self.apply_inline_style(&math.value, context.kind));
                }
                _ => {}
            }
        }

        result
    }

    fn render_code_block(&mut self, code: &mdast::Code, width: usize) -> Vec<String> {
        let is_diagram = self
            .diagrams
            .as_ref()
            .is_some_and(|diagrams| diagrams.handles(code.lang.as_deref()));

        if is_diagram {
            let index = self.diagram_cursor;
            self.diagram_cursor += 1;
            return match self.diagram_blocks.get_mut(index) {
                Some(block) => block.render(width),
                None => vec![PLACEHOLDER.to_string()],
            };
        }

        let index = self.code_cursor;
        self.code_cursor += 1;
        let header = match self.code_headers.get(index) {
            Some(header) => header.line_at(width, Instant::now()),
            None => CodeHeader::new(code.lang.as_deref(), code.value.as_str(), self.copied_duration)
                .line_at(width, Instant::now()),
        };

        let indent = self
            .theme
            .code_block_indent
            .clone()
            .unwrap_or_else(|| "  ".to_string());
        let mut lines = vec![(self.theme.code_header)(&header)];
        match self.theme.highlight_code.as_ref() {
            Some(highlighter) => lines.extend(
                highlighter(&code.value, code.lang.as_deref())
                    .into_iter()
                    .map(|line| format!("{indent}{line}")),
            ),
            None => lines.extend(
                code.value
                    .split('\n')
                    .map(|line| format!("{indent}{}", (self.theme.code_block)(line))),
            ),
        }
        lines
    }

    fn render_list(&mut self, list: &mdast::List, depth: usize, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let indent = "  ".repeat(depth);
        let start = list.start.unwrap_or(1);

        let items = list.children.iter().filter_map(|node| match node {
            mdast::Node::ListItem(item) => Some(item),
            _ => None,
        });
        for (position, item) in items.enumerate() {
            let bullet = if list.ordered {
                format!("{}. ", start + position as u32)
            } else {
                "- ".to_string()
            };
            let bullet = (self.theme.list_bullet)(&bullet);

            let mut first = true;
            for (line, nested) in self.render_list_item(item, depth, width) {
                if nested {
                    lines.push(line);
                } else if first {
                    lines.push(format!("{indent}{bullet}{line}"));
                } else {
                    lines.push(format!("{indent}  {line}"));
                }
                first = false;
            }
            if first {
                lines.push(format!("{indent}{bullet}"));
            }
        }

        lines
    }

    /// Lines of one list item; `true` marks lines of a nested list, which carry their own indent.
    fn render_list_item(
        &mut self,
        item: &mdast::ListItem,
        depth: usize,
        width: usize,
    ) -> Vec<(String, bool)> {
        let mut lines = Vec::new();
        let context = self.default_inline_context();
        let item_width = width.saturating_sub(2 * (depth + 1)).max(1);

        for node in &item.children {
            match node {
                mdast::Node::List(list) => {
                    let nested = self.render_list(list, depth + 1, width);
                    lines.extend(nested.into_iter().map(|line| (line, true)));
                }
                mdast::Node::Code(code) => {
                    let block = self.render_code_block(code, item_width);
                    lines.extend(block.into_iter().map(|line| (line, false)));
                }
                other => {
                    let text = self.render_inline_nodes(std::slice::from_ref(other), &context);
                    if !text.is_empty() {
                        lines.extend(text.split('\n').map(|line| (line.to_string(), false)));
                    }
                }
            }
        }

        lines
    }

    fn render_blockquote(&mut self, blockquote: &mdast::Blockquote, width: usize) -> Vec<String> {
        let context = InlineStyleContext {
            kind: InlineStyleKind::Quote,
            style_prefix: style_prefix_of(|text| (self.theme.quote)(&(self.theme.italic)(text))),
        };
        let quote_text = self.render_inline_nodes(&blockquote.children, &context);
        let border = (self.theme.quote_border)("│ ");
        let content_width = width.saturating_sub(2).max(1);

        quote_text
            .split('\n')
            .flat_map(|line| wrap_text_with_ansi(line, content_width))
            .map(|line| format!("{border}{line}"))
            .collect()
    }

    fn render_table(&mut self, table: &mdast::Table, width: usize, raw: Option<&str>) -> Vec<String> {
        let context = self.default_inline_context();
        let rows: Vec<Vec<String>> = table
            .children
            .iter()
            .filter_map(|node| match node {
                mdast::Node::TableRow(row) => Some(
                    row.children
                        .iter()
                        .map(|cell| match cell {
                            mdast::Node::TableCell(cell) => {
                                self.render_inline_nodes(&cell.children, &context)
                            }
                            other => self.render_inline_nodes(std::slice::from_ref(other), &context),
                        })
                        .collect(),
                ),
                _ => None,
            })
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Vec::new();
        }

        let overhead = 3 * columns + 1;
        let available = width.saturating_sub(overhead);
        if available < columns {
            let mut fallback = raw.map(|raw| wrap_text_with_ansi(raw, width)).unwrap_or_default();
            fallback.push(String::new());
            return fallback;
        }

        let mut widths = vec![1usize; columns];
        for row in &rows {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(visible_width(cell));
            }
        }
        while widths.iter().sum::<usize>() > available {
            let Some((widest, _)) = widths.iter().enumerate().max_by_key(|(_, width)| **width) else {
                break;
            };
            if widths[widest] == 1 {
                break;
            }
            widths[widest] -= 1;
        }

        let border = |left: &str, join: &str, right: &str| {
            let cells: Vec<String> = widths.iter().map(|width| "─".repeat(*width)).collect();
            format!("{left}─{}─{right}", cells.join(&format!("─{join}─")))
        };

        let mut lines = vec![border("┌", "┬", "┐")];
        for (row_idx, row) in rows.iter().enumerate() {
            let wrapped: Vec<Vec<String>> = (0..columns)
                .map(|idx| {
                    let cell = row.get(idx).map(String::as_str).unwrap_or("");
                    wrap_text_with_ansi(cell, widths[idx])
                })
                .collect();
            let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

            for line_idx in 0..height {
                let parts: Vec<String> = wrapped
                    .iter()
                    .zip(&widths)
                    .map(|(cell_lines, width)| {
                        let text = cell_lines.get(line_idx).map(String::as_str).unwrap_or("");
                        let padded = pad_to_width(text, *width);
                        if row_idx == 0 {
                            (self.theme.bold)(&padded)
                        } else {
                            padded
                        }
                    })
                    .collect();
                lines.push(format!("│ {} │", parts.join(" │ ")));
            }

            if row_idx + 1 < rows.len() {
                lines.push(border("├", "┼", "┤"));
            }
        }
        lines.push(border("└", "┴", "┘"));
        lines.push(String::new());
        lines
    }

    fn render_node(
        &mut self,
        node: &mdast::Node,
        width: usize,
        next_is_list: bool,
        has_next: bool,
        space_after: bool,
        raw: Option<&str>,
    ) -> Vec<String> {
        let mut lines = match node {
            mdast::Node::Heading(heading) => {
                let context = self.default_inline_context();
                let text = self.render_inline_nodes(&heading.children, &context);
                let styled = match heading.depth {
                    1 => (self.theme.bold)(&(self.theme.underline)(&text)),
                    2 => (self.theme.bold)(&text),
                    depth => (self.theme.bold)(&format!("{} {text}", "#".repeat(depth as usize))),
                };
                vec![(self.theme.heading)(&styled)]
            }
            mdast::Node::Paragraph(paragraph) => {
                let context = self.default_inline_context();
                let text = self.render_inline_nodes(&paragraph.children, &context);
                let mut lines = vec![text];
                if has_next && !next_is_list && !space_after {
                    lines.push(String::new());
                }
                return lines;
            }
            mdast::Node::Code(code) => self.render_code_block(code, width),
            mdast::Node::List(list) => return self.render_list(list, 0, width),
            mdast::Node::Blockquote(blockquote) => self.render_blockquote(blockquote, width),
            mdast::Node::ThematicBreak(_) => vec![(self.theme.hr)(&"─".repeat(width.min(80)))],
            mdast::Node::Html(html) => return vec![self.apply_text_style(html.value.trim())],
            mdast::Node::Table(table) => return self.render_table(table, width, raw),
            mdast::Node::Text(text) => return vec![self.apply_text_style(&text.value)],
            mdast::Node::Break(_) => return vec![String::new()],
            _ => return Vec::new(),
        };

        if !space_after {
            lines.push(String::new());
        }
        lines
    }
}

impl Component for Markdown {
    fn render(&mut self, width: usize) -> Vec<String> {
        if let Some(cached) = self.cached_lines.as_ref() {
            if self.cached_text.as_deref() == Some(self.text.as_str())
                && self.cached_width == Some(width)
            {
                return cached.clone();
            }
        }

        self.cached_text = Some(self.text.clone());
        self.cached_width = Some(width);

        if self.text.trim().is_empty() {
            self.cached_lines = Some(Vec::new());
            return Vec::new();
        }

        let content_width = width.saturating_sub(self.padding_x * 2).max(1);
        let source = self.text.replace('\t', "   ");
        let nodes = match to_mdast(&source, &ParseOptions::gfm()) {
            Ok(mdast::Node::Root(root)) => root.children,
            Ok(other) => vec![other],
            Err(_) => vec![mdast::Node::Text(mdast::Text {
                value: source.clone(),
                position: None,
            })],
        };

        self.diagram_cursor = 0;
        self.code_cursor = 0;

        let mut rendered = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            let next = nodes.get(idx + 1);
            let space_after = match (node_span(node), next.and_then(node_span)) {
                (Some((_, end)), Some((next_start, _))) => blank_line_between(&source, end, next_start),
                _ => false,
            };
            let raw = table_source(node, &source);

            rendered.extend(self.render_node(
                node,
                content_width,
                matches!(next, Some(mdast::Node::List(_))),
                next.is_some(),
                space_after,
                raw,
            ));
            if space_after {
                rendered.push(String::new());
            }
        }

        let margin = " ".repeat(self.padding_x);
        let mut lines: Vec<String> = vec![" ".repeat(width); self.padding_y];
        for line in rendered {
            for wrapped in wrap_text_with_ansi(&line, content_width) {
                lines.push(pad_to_width(&format!("{margin}{wrapped}{margin}"), width));
            }
        }
        lines.extend(std::iter::repeat(" ".repeat(width)).take(self.padding_y));

        self.cached_lines = Some(lines.clone());
        lines
    }

    fn invalidate(&mut self) {
        self.cached_text = None;
        self.cached_width = None;
        self.cached_lines = None;
    }
}

/// Code blocks in the order rendering visits them: top level, then inside list items.
fn collect_code_blocks(nodes: &[mdast::Node], out: &mut Vec<CodeBlockRef>) {
    for node in nodes {
        match node {
            mdast::Node::Code(code) => out.push(CodeBlockRef {
                lang: code.lang.clone(),
                value: code.value.clone(),
            }),
            mdast::Node::List(list) => {
                for child in &list.children {
                    if let mdast::Node::ListItem(item) = child {
                        collect_code_blocks(&item.children, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn style_prefix_of(style: impl Fn(&str) -> String) -> String {
    let sentinel = "\u{0000}";
    let styled = style(sentinel);
    styled
        .find(sentinel)
        .map(|idx| styled[..idx].to_string())
        .unwrap_or_default()
}

fn plain_text(nodes: &[mdast::Node]) -> String {
    nodes
        .iter()
        .map(|node| match node {
            mdast::Node::Text(text) => text.value.clone(),
            mdast::Node::InlineCode(code) => code.value.clone(),
            mdast::Node::Html(html) => html.value.clone(),
            mdast::Node::Image(image) => image.alt.clone(),
            mdast::Node::Strong(mdast::Strong { children, .. })
            | mdast::Node::Emphasis(mdast::Emphasis { children, .. })
            | mdast::Node::Delete(mdast::Delete { children, .. })
            | mdast::Node::Link(mdast::Link { children, .. })
            | mdast::Node::Paragraph(mdast::Paragraph { children, .. }) => plain_text(children),
            _ => String::new(),
        })
        .collect()
}

fn node_span(node: &mdast::Node) -> Option<(usize, usize)> {
    node.position()
        .map(|position| (position.start.offset, position.end.offset))
}

fn table_source<'a>(node: &mdast::Node, source: &'a str) -> Option<&'a str> {
    let mdast::Node::Table(_) = node else {
        return None;
    };
    let (start, end) = node_span(node)?;
    source.get(start..end).filter(|raw| !raw.is_empty())
}

fn blank_line_between(source: &str, end: usize, next_start: usize) -> bool {
    source
        .get(end..next_start)
        .is_some_and(|gap| gap.matches('\n').count() >= 2)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::{DefaultTextStyle, DiagramSupport, Markdown, MarkdownTheme};
    use crate::clipboard::{Clipboard, ClipboardError};
    use crate::core::component::Component;
    use crate::diagram::{DiagramError, DiagramRenderer};
    use crate::render::{InlineExecutor, RenderExecutor, RenderJob, StageState, PLACEHOLDER};

    fn theme() -> MarkdownTheme {
        MarkdownTheme {
            heading: Box::new(|text| format!("<h>{text}</h>")),
            link: Box::new(|text| format!("<l>{text}</l>")),
            link_url: Box::new(|text| format!("<u>{text}</u>")),
            code: Box::new(|text| format!("`{text}`")),
            code_block: Box::new(|text| format!("<code>{text}</code>")),
            code_header: Box::new(|text| format!("<ch>{text}</ch>")),
            quote: Box::new(|text| format!("<q>{text}</q>")),
            quote_border: Box::new(|text| text.to_string()),
            hr: Box::new(|text| format!("<hr>{text}</hr>")),
            list_bullet: Box::new(|text| format!("<b>{text}</b>")),
            bold: Box::new(|text| format!("<b>{text}</b>")),
            italic: Box::new(|text| format!("<i>{text}</i>")),
            strikethrough: Box::new(|text| format!("<s>{text}</s>")),
            underline: Box::new(|text| format!("<u>{text}</u>")),
            highlight_code: None,
            code_block_indent: None,
        }
    }

    fn trimmed(lines: Vec<String>) -> Vec<String> {
        lines.into_iter().map(|line| line.trim_end().to_string()).collect()
    }

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl DiagramRenderer for CountingRenderer {
        fn render(&self, source: &str) -> Result<Vec<String>, DiagramError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![format!("<diagram {} lines>", source.lines().count())])
        }
    }

    #[derive(Default)]
    struct DeferredExecutor {
        jobs: Mutex<Vec<RenderJob>>,
    }

    impl RenderExecutor for DeferredExecutor {
        fn spawn(&self, job: RenderJob) -> io::Result<()> {
            self.jobs.lock().expect("jobs lock").push(job);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        writes: Vec<String>,
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.writes.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn headings_apply_styles_and_spacing() {
        let mut markdown = Markdown::new("# Title\nParagraph", 0, 0, theme(), None);
        let lines = trimmed(markdown.render(40));
        assert_eq!(lines[0], "<h><b><u>Title</u></b></h>");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Paragraph");
    }

    #[test]
    fn link_shows_url_only_when_text_differs() {
        let mut markdown = Markdown::new("[x](x)\n[y](z)", 0, 0, theme(), None);
        let lines = trimmed(markdown.render(80));
        assert_eq!(lines[0], "<l><u>x</u></l>");
        assert_eq!(lines[1], "<l><u>y</u></l><u> (z)</u>");
    }

    #[test]
    fn blockquote_is_prefixed() {
        let mut markdown = Markdown::new("> quote", 0, 0, theme(), None);
        assert_eq!(trimmed(markdown.render(80))[0], "│ <q><i>quote</i></q>");
    }

    #[test]
    fn nested_lists_keep_their_indent() {
        let mut markdown = Markdown::new("1. one\n   - inner\n2. two", 0, 0, theme(), None);
        let lines = trimmed(markdown.render(80));
        assert_eq!(lines[0], "<b>1. </b>one");
        assert_eq!(lines[1], "  <b>- </b>inner");
        assert_eq!(lines[2], "<b>2. </b>two");
    }

    #[test]
    fn table_renders_borders() {
        let input = "| a | b |\n| - | - |\n| c | d |";
        let mut markdown = Markdown::new(input, 0, 0, MarkdownTheme::plain(), None);
        let lines = trimmed(markdown.render(80));
        assert_eq!(
            &lines[..5],
            &["┌───┬───┐", "│ a │ b │", "├───┼───┤", "│ c │ d │", "└───┴───┘"]
        );
    }

    #[test]
    fn default_style_applies_prefix() {
        let style = DefaultTextStyle {
            color: Some(Box::new(|text| format!("<c>{text}</c>"))),
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
        };
        let mut markdown = Markdown::new("hello **world**", 0, 0, theme(), Some(style));
        let lines = markdown.render(80);
        assert!(lines[0].starts_with("<c>hello </c><b><c>world</c></b>"));
    }

    #[test]
    fn code_block_gets_header_and_body() {
        let mut markdown =
            Markdown::new("```Rust\nlet x = 1;\n```", 0, 0, MarkdownTheme::plain(), None);
        let lines = trimmed(markdown.render(30));
        assert_eq!(lines[0], "rust                    ⧉ copy");
        assert_eq!(lines[1], "  let x = 1;");
        assert_eq!(markdown.code_block_count(), 1);
    }

    #[test]
    fn copying_a_code_block_flips_its_header() {
        let mut clipboard = RecordingClipboard::default();
        let mut markdown = Markdown::new("```sh\nls -la\n```", 0, 0, MarkdownTheme::plain(), None);
        markdown.render(30);

        assert!(markdown.copy_code_block(0, &mut clipboard).expect("copy"));
        assert!(!markdown.copy_code_block(3, &mut clipboard).expect("no block"));
        assert_eq!(clipboard.writes, vec!["ls -la".to_string()]);
        assert!(trimmed(markdown.render(30))[0].ends_with("✓ copied"));
    }

    #[test]
    fn mermaid_without_diagram_support_is_plain_code() {
        let mut markdown = Markdown::new(
            "```mermaid\ngraph TD\n A-->B\n```",
            0,
            0,
            MarkdownTheme::plain(),
            None,
        );
        let lines = trimmed(markdown.render(30));
        assert!(lines[0].starts_with("mermaid"));
        assert!(markdown.diagram_blocks().is_empty());
    }

    #[test]
    fn streamed_diagram_renders_once_after_closing_fence() {
        let renderer = Arc::new(CountingRenderer::default());
        let support = DiagramSupport::new(renderer.clone(), Arc::new(InlineExecutor));
        let mut markdown =
            Markdown::new("", 0, 0, MarkdownTheme::plain(), None).with_diagrams(support);

        markdown.set_text("```mermaid\ngraph TD\n A-->B");
        markdown.poll();
        assert_eq!(trimmed(markdown.render(40))[0], PLACEHOLDER);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert!(!markdown.diagram_blocks()[0].is_complete());

        markdown.set_text("```mermaid\ngraph TD\n A-->B\n```");
        assert!(markdown.poll());
        assert_eq!(trimmed(markdown.render(40))[0], "<diagram 2 lines>");
        assert_eq!(markdown.diagram_blocks()[0].state(), StageState::Rendered);

        markdown.set_text("```mermaid\ngraph TD\n A-->B\n```\n\nDone.");
        markdown.poll();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_diagram_block_is_torn_down() {
        let executor = Arc::new(DeferredExecutor::default());
        let renderer = Arc::new(CountingRenderer::default());
        let support = DiagramSupport::new(renderer, executor.clone());
        let mut markdown = Markdown::new("```mermaid\ngraph TD\n A-->B\n```", 0, 0, theme(), None)
            .with_diagrams(support);
        assert_eq!(markdown.diagram_blocks().len(), 1);

        markdown.set_text("no diagram anymore");
        assert!(markdown.diagram_blocks().is_empty());

        let jobs: Vec<RenderJob> = executor.jobs.lock().expect("jobs lock").drain(..).collect();
        assert_eq!(jobs.len(), 1);
        for job in jobs {
            job();
        }
        assert!(!markdown.poll());
    }
}
