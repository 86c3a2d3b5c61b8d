//! Fenced diagram block that renders once its closing fence has streamed in.

use std::sync::Arc;

use crate::core::component::Component;
use crate::core::text::width::truncate_to_width;
use crate::diagram::DiagramRenderer;
use crate::render::{RenderExecutor, RenderRegion, RenderStaging, StageState};
use crate::stream::is_complete;

pub struct DiagramBlock {
    language: String,
    content: String,
    complete: bool,
    staging: RenderStaging<RenderRegion>,
}

impl DiagramBlock {
    pub fn new(
        language: impl Into<String>,
        renderer: Arc<dyn DiagramRenderer>,
        executor: Arc<dyn RenderExecutor>,
    ) -> Self {
        let language = language.into();
        let staging = RenderStaging::new(RenderRegion::new(), language.clone(), renderer, executor);
        Self {
            language,
            content: String::new(),
            complete: false,
            staging,
        }
    }

    /// Re-evaluates completion of `content` inside the message snapshot `full_text`.
    ///
    /// Returns `true` when a render was dispatched.
    pub fn sync(&mut self, full_text: &str, content: &str) -> bool {
        self.complete = is_complete(full_text, content);
        if self.content != content {
            self.content = content.to_string();
        }
        self.staging.sync(self.complete, content)
    }

    pub fn poll(&mut self) -> bool {
        self.staging.poll()
    }

    pub fn teardown(&mut self) {
        self.staging.teardown();
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn state(&self) -> StageState {
        self.staging.state()
    }
}

impl Component for DiagramBlock {
    fn render(&mut self, width: usize) -> Vec<String> {
        self.staging
            .lines()
            .iter()
            .map(|line| truncate_to_width(line, width))
            .collect()
    }
}
