//! Render staging for one diagram block.
//!
//! The UI thread calls [`RenderStaging::sync`] with the block's completion state on every
//! message update and [`RenderStaging::poll`] before drawing. A completed block is handed to
//! the renderer once per distinct `(complete, content)` key; the render itself runs on a
//! [`RenderExecutor`] and its outcome is applied only from `poll`.
//!
//! Every dispatched render carries the generation it was started under. Teardown, or a newer
//! sync, bumps the generation so late outcomes are dropped without touching the target.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::diagram::{DiagramError, DiagramRenderer};

use super::node::{NodeId, RenderNode, RenderRegion, RenderTarget};

/// Text shown while the block is still streaming.
pub const PLACEHOLDER: &str = "Drawing diagram...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Idle,
    Rendering,
    Rendered,
    Errored,
}

pub type RenderJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs render jobs off the UI thread.
pub trait RenderExecutor: Send + Sync {
    fn spawn(&self, job: RenderJob) -> io::Result<()>;
}

/// Spawns one named thread per render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl RenderExecutor for ThreadExecutor {
    fn spawn(&self, job: RenderJob) -> io::Result<()> {
        thread::Builder::new()
            .name("diagram-render".to_string())
            .spawn(job)
            .map(|_| ())
    }
}

/// Runs the job on the calling thread. The outcome still waits for the next `poll`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl RenderExecutor for InlineExecutor {
    fn spawn(&self, job: RenderJob) -> io::Result<()> {
        job();
        Ok(())
    }
}

struct RenderOutcome {
    generation: u64,
    node: NodeId,
    result: Result<Vec<String>, DiagramError>,
}

pub struct RenderStaging<T: RenderTarget = RenderRegion> {
    target: T,
    kind: String,
    renderer: Arc<dyn DiagramRenderer>,
    executor: Arc<dyn RenderExecutor>,
    state: StageState,
    last_key: Option<(bool, String)>,
    generation: u64,
    next_node_id: NodeId,
    torn_down: bool,
    outcome_tx: Sender<RenderOutcome>,
    outcome_rx: Option<Receiver<RenderOutcome>>,
}

impl<T: RenderTarget> RenderStaging<T> {
    /// `kind` is the content class stamped on every staged node (for example `"mermaid"`).
    pub fn new(
        mut target: T,
        kind: impl Into<String>,
        renderer: Arc<dyn DiagramRenderer>,
        executor: Arc<dyn RenderExecutor>,
    ) -> Self {
        target.show_placeholder(PLACEHOLDER);
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            target,
            kind: kind.into(),
            renderer,
            executor,
            state: StageState::Idle,
            last_key: None,
            generation: 0,
            next_node_id: 1,
            torn_down: false,
            outcome_tx,
            outcome_rx: Some(outcome_rx),
        }
    }

    /// Feeds the latest completion state for the block.
    ///
    /// Returns `true` when a render was dispatched. Repeating the previous key is a no-op.
    pub fn sync(&mut self, complete: bool, content: &str) -> bool {
        if self.torn_down {
            return false;
        }
        if self
            .last_key
            .as_ref()
            .is_some_and(|(last_complete, last_content)| {
                *last_complete == complete && last_content == content
            })
        {
            return false;
        }
        self.last_key = Some((complete, content.to_string()));
        self.generation += 1;

        if !complete {
            self.state = StageState::Idle;
            self.target.show_placeholder(PLACEHOLDER);
            return false;
        }

        let node_id = self.next_node_id;
        self.next_node_id += 1;
        self.target
            .replace_children(RenderNode::new(node_id, content).with_class(self.kind.as_str()));
        self.state = StageState::Rendering;

        let generation = self.generation;
        let renderer = Arc::clone(&self.renderer);
        let outcome_tx = self.outcome_tx.clone();
        let source = content.to_string();
        let job: RenderJob = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(|| renderer.render(&source)))
                .unwrap_or(Err(DiagramError::Panicked));
            // The receiver is gone once the block is torn down.
            let _ = outcome_tx.send(RenderOutcome {
                generation,
                node: node_id,
                result,
            });
        });

        if let Err(error) = self.executor.spawn(job) {
            tracing::warn!(%error, kind = %self.kind, "failed to dispatch diagram render");
            self.state = StageState::Errored;
            return false;
        }
        tracing::debug!(generation, kind = %self.kind, "diagram render dispatched");
        true
    }

    /// Applies finished renders. Returns `true` when the target changed.
    pub fn poll(&mut self) -> bool {
        let Some(outcome_rx) = self.outcome_rx.as_ref() else {
            return false;
        };
        let outcomes: Vec<RenderOutcome> = outcome_rx.try_iter().collect();

        let mut changed = false;
        for outcome in outcomes {
            if self.torn_down || outcome.generation != self.generation {
                tracing::debug!(
                    generation = outcome.generation,
                    current = self.generation,
                    "discarding stale diagram render"
                );
                continue;
            }

            match outcome.result {
                Ok(lines) => match self.target.node_mut(outcome.node) {
                    Some(node) => {
                        node.set_rendered(lines);
                        self.state = StageState::Rendered;
                        changed = true;
                    }
                    None => {
                        tracing::warn!(node = outcome.node, "diagram node left the render target");
                        self.state = StageState::Errored;
                    }
                },
                Err(error) => {
                    tracing::warn!(%error, kind = %self.kind, "diagram render failed");
                    self.state = StageState::Errored;
                }
            }
        }
        changed
    }

    /// Detaches from any in-flight render. Later outcomes are never applied.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.generation += 1;
        self.outcome_rx = None;
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn lines(&self) -> Vec<String> {
        self.target.lines()
    }
}

impl<T: RenderTarget> Drop for RenderStaging<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
