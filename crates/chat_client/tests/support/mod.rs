#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chat_client::{App, ClientEvent, RuntimeController};
use chat_protocol::{CancelSignal, ChatRequest, ChatTransport, FinishReason, RunEvent, RunId};
use diagram_chat::{
    Clipboard, ClipboardError, DiagramError, DiagramRenderer, DiagramSupport, InlineExecutor,
    ThreadTheme, ThreadView,
};

pub const WIDTH: usize = 60;

#[derive(Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiagramRenderer for CountingRenderer {
    fn render(&self, source: &str) -> Result<Vec<String>, DiagramError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![format!("<diagram of {} lines>", source.lines().count())])
    }
}

#[derive(Clone, Default)]
pub struct RecordingClipboard {
    writes: Arc<Mutex<Vec<String>>>,
}

impl RecordingClipboard {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().expect("clipboard lock").clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.writes
            .lock()
            .expect("clipboard lock")
            .push(text.to_string());
        Ok(())
    }
}

pub enum Script {
    Reply {
        chunks: Vec<&'static str>,
        reason: FinishReason,
    },
    Fail(&'static str),
    Silent,
    WaitForCancel,
}

pub struct ScriptedTransport {
    script: Script,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn reply(chunks: Vec<&'static str>) -> Arc<Self> {
        Self::new(Script::Reply {
            chunks,
            reason: FinishReason::Stop,
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ChatTransport for ScriptedTransport {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn run(
        &self,
        run_id: RunId,
        request: ChatRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), String> {
        self.requests.lock().expect("requests lock").push(request);

        match &self.script {
            Script::Reply { chunks, reason } => {
                emit(RunEvent::Started { run_id });
                for chunk in chunks {
                    emit(RunEvent::Chunk {
                        run_id,
                        text: chunk.to_string(),
                    });
                }
                emit(RunEvent::Finished {
                    run_id,
                    reason: *reason,
                });
                Ok(())
            }
            Script::Fail(error) => Err(error.to_string()),
            Script::Silent => Ok(()),
            Script::WaitForCancel => {
                emit(RunEvent::Started { run_id });
                emit(RunEvent::Chunk {
                    run_id,
                    text: "partial".to_string(),
                });
                while !cancel.load(Ordering::Acquire) {
                    thread::sleep(Duration::from_millis(5));
                }
                emit(RunEvent::Chunk {
                    run_id,
                    text: " after cancel".to_string(),
                });
                emit(RunEvent::Cancelled { run_id });
                Ok(())
            }
        }
    }
}

pub struct Harness {
    pub app: App,
    pub controller: RuntimeController,
    pub events: Receiver<ClientEvent>,
    pub renderer: Arc<CountingRenderer>,
    pub clipboard: RecordingClipboard,
}

impl Harness {
    pub fn new(app: App, transport: Arc<dyn ChatTransport>) -> Self {
        let renderer = Arc::new(CountingRenderer::default());
        let clipboard = RecordingClipboard::default();
        let (sender, events) = mpsc::channel();
        let thread = ThreadView::new(ThreadTheme::plain()).with_diagrams(DiagramSupport::new(
            Arc::clone(&renderer) as Arc<dyn DiagramRenderer>,
            Arc::new(InlineExecutor),
        ));
        let controller =
            RuntimeController::new(transport, sender, thread, Box::new(clipboard.clone()));

        Self {
            app,
            controller,
            events,
            renderer,
            clipboard,
        }
    }

    pub fn submit(&mut self, input: &str) {
        self.app.on_submit(input, &mut self.controller);
        self.controller.refresh(&self.app);
    }

    /// Applies exactly `count` worker events.
    pub fn pump_events(&mut self, count: usize) -> Vec<RunEvent> {
        (0..count).map(|_| self.pump_one()).collect()
    }

    /// Applies worker events one by one, refreshing the view after each, until a terminal
    /// event arrives.
    pub fn pump_until_terminal(&mut self) -> Vec<RunEvent> {
        let mut seen = Vec::new();
        loop {
            let event = self.pump_one();
            let terminal = event.is_terminal();
            seen.push(event);
            if terminal {
                return seen;
            }
        }
    }

    fn pump_one(&mut self) -> RunEvent {
        let event = match self
            .events
            .recv_timeout(Duration::from_secs(5))
            .expect("run event before timeout")
        {
            ClientEvent::Run(event) => event,
            other => panic!("unexpected client event {other:?}"),
        };
        self.controller.apply_run_event(&mut self.app, event.clone());
        self.controller.refresh(&self.app);
        event
    }

    pub fn render(&mut self) -> Vec<String> {
        self.controller.refresh(&self.app);
        self.controller.render(WIDTH)
    }
}
