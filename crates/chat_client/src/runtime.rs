use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chat_protocol::{CancelSignal, ChatRequest, ChatTransport, RunEvent, RunId};
use diagram_chat::{Clipboard, Component, MessageId, ThreadView};

use crate::app::{App, HostOps, ERROR_RUN_ALREADY_ACTIVE};

/// Everything the main loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Input(String),
    InputClosed,
    Run(RunEvent),
}

struct ActiveRun {
    run_id: RunId,
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
}

/// Owns run workers, the transcript view and the clipboard on the UI thread.
///
/// Workers never touch [`App`]; their events travel over the client event channel and are
/// applied by [`RuntimeController::apply_run_event`].
pub struct RuntimeController {
    transport: Arc<dyn ChatTransport>,
    events: Sender<ClientEvent>,
    next_run_id: RunId,
    active_run: Option<ActiveRun>,
    thread: ThreadView,
    clipboard: Box<dyn Clipboard>,
    render_requested: bool,
    stop_requested: bool,
}

impl RuntimeController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        events: Sender<ClientEvent>,
        thread: ThreadView,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        Self {
            transport,
            events,
            next_run_id: 1,
            active_run: None,
            thread,
            clipboard,
            render_requested: true,
            stop_requested: false,
        }
    }

    pub fn active_run_id(&self) -> Option<RunId> {
        self.active_run.as_ref().map(|run| run.run_id)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Applies one worker event to the app. A terminal event releases the worker slot.
    pub fn apply_run_event(&mut self, app: &mut App, event: RunEvent) {
        if event.is_terminal() && self.active_run_id() == Some(event.run_id()) {
            self.release_active_run();
        }

        app.apply_run_event(event);
        self.render_requested = true;
    }

    /// Syncs the view with the transcript and applies finished diagram renders. Returns
    /// `true` when the screen needs a redraw.
    pub fn refresh(&mut self, app: &App) -> bool {
        let mut dirty = std::mem::take(&mut self.render_requested);
        if dirty {
            self.thread.sync(&app.transcript);
        }
        dirty |= self.thread.poll();
        dirty
    }

    pub fn render(&mut self, width: usize) -> Vec<String> {
        self.thread.render(width)
    }

    /// Cancels any running worker and detaches every in-flight diagram render.
    pub fn shutdown(&mut self) {
        if let Some(active) = self.active_run.as_ref() {
            active.cancel.store(true, Ordering::Release);
        }
        self.release_active_run();
        self.thread.teardown();
    }

    fn release_active_run(&mut self) {
        if let Some(mut active) = self.active_run.take() {
            if let Some(handle) = active.join_handle.take() {
                if handle.is_finished() {
                    let _ = handle.join();
                }
            }
        }
    }

    fn spawn_worker(
        &self,
        run_id: RunId,
        request: ChatRequest,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, String> {
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        thread::Builder::new()
            .name(format!("chat-run-{run_id}"))
            .spawn(move || run_worker(transport, events, run_id, request, cancel))
            .map_err(|error| format!("Failed to spawn run worker: {error}"))
    }
}

fn run_worker(
    transport: Arc<dyn ChatTransport>,
    events: Sender<ClientEvent>,
    run_id: RunId,
    request: ChatRequest,
    cancel: CancelSignal,
) {
    tracing::debug!(run_id, endpoint = %transport.describe(), "run worker started");
    let terminal_emitted = AtomicBool::new(false);
    let mut emit = |event: RunEvent| {
        if event.is_terminal() {
            terminal_emitted.store(true, Ordering::SeqCst);
        }
        let _ = events.send(ClientEvent::Run(event));
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        transport.run(run_id, request, Arc::clone(&cancel), &mut emit)
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => emit(RunEvent::Failed { run_id, error }),
        Err(_) => emit(RunEvent::Failed {
            run_id,
            error: "Chat transport panicked".to_string(),
        }),
    }

    if !terminal_emitted.load(Ordering::SeqCst) {
        emit(RunEvent::Failed {
            run_id,
            error: "Chat transport exited without terminal event".to_string(),
        });
    }
}

impl HostOps for RuntimeController {
    fn start_run(&mut self, request: ChatRequest) -> Result<RunId, String> {
        if self.active_run.is_some() {
            return Err(ERROR_RUN_ALREADY_ACTIVE.to_string());
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let join_handle = self.spawn_worker(run_id, request, Arc::clone(&cancel))?;

        self.active_run = Some(ActiveRun {
            run_id,
            cancel,
            join_handle: Some(join_handle),
        });
        Ok(run_id)
    }

    fn cancel_run(&mut self, run_id: RunId) {
        if let Some(active) = self.active_run.as_ref().filter(|run| run.run_id == run_id) {
            tracing::debug!(run_id, "cancelling run");
            active.cancel.store(true, Ordering::Release);
        }
    }

    fn copy_code_block(&mut self, message_id: MessageId, index: usize) -> Result<bool, String> {
        let copied = self
            .thread
            .copy_code_block(message_id, index, self.clipboard.as_mut())
            .map_err(|error| error.to_string())?;
        if copied {
            self.render_requested = true;
        }
        Ok(copied)
    }

    fn request_render(&mut self) {
        self.render_requested = true;
    }

    fn request_stop(&mut self) {
        self.stop_requested = true;
    }
}
