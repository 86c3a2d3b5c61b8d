//! Transcript view: one entry per message, keyed by message id.

use std::time::Duration;

use super::markdown::{DiagramSupport, Markdown, MarkdownStyleFn, MarkdownTheme};
use crate::clipboard::{Clipboard, ClipboardError, DEFAULT_COPIED_DURATION};
use crate::core::component::Component;
use crate::core::text::wrap::wrap_text_with_ansi;
use crate::stream::{Message, MessageId, MessageRole, MessageStatus};

pub struct ThreadTheme {
    pub markdown: Box<dyn Fn() -> MarkdownTheme>,
    pub user_label: MarkdownStyleFn,
    pub assistant_label: MarkdownStyleFn,
    pub system_label: MarkdownStyleFn,
    pub status: MarkdownStyleFn,
    pub error: MarkdownStyleFn,
}

impl ThreadTheme {
    pub fn plain() -> Self {
        fn same(text: &str) -> String {
            text.to_string()
        }
        Self {
            markdown: Box::new(MarkdownTheme::plain),
            user_label: Box::new(same),
            assistant_label: Box::new(same),
            system_label: Box::new(same),
            status: Box::new(same),
            error: Box::new(same),
        }
    }
}

struct ThreadEntry {
    id: MessageId,
    role: MessageRole,
    status: MessageStatus,
    body: Markdown,
}

pub struct ThreadView {
    theme: ThreadTheme,
    diagrams: Option<DiagramSupport>,
    copied_duration: Duration,
    entries: Vec<ThreadEntry>,
    cached: Option<(usize, Vec<String>)>,
}

impl ThreadView {
    pub fn new(theme: ThreadTheme) -> Self {
        Self {
            theme,
            diagrams: None,
            copied_duration: DEFAULT_COPIED_DURATION,
            entries: Vec::new(),
            cached: None,
        }
    }

    pub fn with_diagrams(mut self, diagrams: DiagramSupport) -> Self {
        self.diagrams = Some(diagrams);
        self
    }

    pub fn with_copied_duration(mut self, copied_duration: Duration) -> Self {
        self.copied_duration = copied_duration;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn body(&self, id: MessageId) -> Option<&Markdown> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.body)
    }

    /// Brings the view in line with the transcript snapshot. Entries whose message is gone are
    /// torn down; every remaining diagram block re-evaluates its completion.
    pub fn sync(&mut self, messages: &[Message]) {
        let mut previous = std::mem::take(&mut self.entries);

        for message in messages {
            let mut entry = match previous.iter().position(|entry| entry.id == message.id) {
                Some(position) => previous.swap_remove(position),
                None => self.new_entry(message),
            };
            entry.role = message.role;
            entry.status = message.status.clone();
            entry.body.set_text(message.text.as_str());
            self.entries.push(entry);
        }

        for mut stale in previous {
            tracing::debug!(message_id = stale.id, "tearing down removed message");
            stale.body.teardown();
        }
        self.cached = None;
    }

    /// Applies finished diagram renders. Returns `true` when a redraw is needed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for entry in &mut self.entries {
            changed |= entry.body.poll();
        }
        if changed {
            self.cached = None;
        }
        changed
    }

    pub fn copy_code_block(
        &mut self,
        id: MessageId,
        index: usize,
        clipboard: &mut dyn Clipboard,
    ) -> Result<bool, ClipboardError> {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return Ok(false);
        };
        let copied = entry.body.copy_code_block(index, clipboard)?;
        if copied {
            self.cached = None;
        }
        Ok(copied)
    }

    pub fn teardown(&mut self) {
        for entry in &mut self.entries {
            entry.body.teardown();
        }
    }

    fn new_entry(&self, message: &Message) -> ThreadEntry {
        let mut body = Markdown::new("", 0, 0, (self.theme.markdown)(), None)
            .with_copied_duration(self.copied_duration);
        if message.role == MessageRole::Assistant {
            if let Some(diagrams) = self.diagrams.clone() {
                body = body.with_diagrams(diagrams);
            }
        }
        ThreadEntry {
            id: message.id,
            role: message.role,
            status: message.status.clone(),
            body,
        }
    }

    fn label(&self, entry: &ThreadEntry) -> String {
        let (style, name) = match entry.role {
            MessageRole::User => (&self.theme.user_label, "you"),
            MessageRole::Assistant => (&self.theme.assistant_label, "assistant"),
            MessageRole::System => (&self.theme.system_label, "system"),
        };
        let mut label = style(name);
        if entry.status.is_running() {
            label.push_str(&(self.theme.status)(" …"));
        }
        label
    }
}

impl Component for ThreadView {
    fn render(&mut self, width: usize) -> Vec<String> {
        if let Some((cached_width, lines)) = self.cached.as_ref() {
            if *cached_width == width {
                return lines.clone();
            }
        }

        let mut lines = Vec::new();
        for idx in 0..self.entries.len() {
            if idx > 0 {
                lines.push(String::new());
            }
            let label = self.label(&self.entries[idx]);
            lines.push(label);

            let entry = &mut self.entries[idx];
            let body = entry.body.render(width);
            lines.extend(body.into_iter().map(|line| line.trim_end().to_string()));
            while lines.last().is_some_and(|line| line.is_empty()) {
                lines.pop();
            }

            if let MessageStatus::Failed(error) = &entry.status {
                let error_line = format!("error: {error}");
                for line in wrap_text_with_ansi(&error_line, width) {
                    lines.push((self.theme.error)(&line));
                }
            }
        }

        self.cached = Some((width, lines.clone()));
        lines
    }

    fn invalidate(&mut self) {
        self.cached = None;
        for entry in &mut self.entries {
            entry.body.invalidate();
        }
    }
}
