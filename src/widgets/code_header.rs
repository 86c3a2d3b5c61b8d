//! Header line above a fenced code block: language label plus a copy indicator.

use std::time::{Duration, Instant};

use crate::clipboard::{Clipboard, ClipboardError, CopyToClipboard};
use crate::core::component::Component;
use crate::core::text::width::{truncate_to_width, visible_width};

pub type CodeHeaderStyleFn = Box<dyn Fn(&str) -> String>;

const COPY_LABEL: &str = "⧉ copy";
const COPIED_LABEL: &str = "✓ copied";

pub struct CodeHeader {
    language: String,
    code: String,
    copy: CopyToClipboard,
    style: Option<CodeHeaderStyleFn>,
}

impl CodeHeader {
    pub fn new(language: Option<&str>, code: impl Into<String>, copied_duration: Duration) -> Self {
        Self {
            language: language.unwrap_or_default().to_lowercase(),
            code: code.into(),
            copy: CopyToClipboard::new(copied_duration),
            style: None,
        }
    }

    pub fn with_style(mut self, style: CodeHeaderStyleFn) -> Self {
        self.style = Some(style);
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Tracks the latest code text; the copied state survives the update.
    pub fn set_code(&mut self, language: Option<&str>, code: &str) {
        self.language = language.unwrap_or_default().to_lowercase();
        if self.code != code {
            self.code = code.to_string();
        }
    }

    pub fn is_copied(&self) -> bool {
        self.copy.is_copied()
    }

    /// Copies the block. Ignored while the code is empty or the indicator already shows copied.
    pub fn on_copy(&mut self, clipboard: &mut dyn Clipboard) -> Result<bool, ClipboardError> {
        self.on_copy_at(clipboard, Instant::now())
    }

    pub fn on_copy_at(
        &mut self,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<bool, ClipboardError> {
        if self.code.is_empty() || self.copy.is_copied_at(now) {
            return Ok(false);
        }
        self.copy.copy_at(clipboard, &self.code, now)
    }

    pub fn line_at(&self, width: usize, now: Instant) -> String {
        let action = if self.copy.is_copied_at(now) {
            COPIED_LABEL
        } else {
            COPY_LABEL
        };
        let gap = width
            .saturating_sub(visible_width(&self.language) + visible_width(action))
            .max(1);
        let line = truncate_to_width(&format!("{}{}{action}", self.language, " ".repeat(gap)), width);
        match self.style.as_ref() {
            Some(style) => style(&line),
            None => line,
        }
    }
}

impl Component for CodeHeader {
    fn render(&mut self, width: usize) -> Vec<String> {
        vec![self.line_at(width, Instant::now())]
    }
}
