use chat_protocol::{ChatMessage, ChatRequest, FinishReason, RunEvent, RunId, ToolCall};
use diagram_chat::{Message, MessageId, MessageRole};

use crate::commands::{parse_slash_command, SlashCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Running { run_id: RunId },
    Error(String),
    Exiting,
}

pub trait HostOps {
    fn start_run(&mut self, request: ChatRequest) -> Result<RunId, String>;
    fn cancel_run(&mut self, run_id: RunId);
    /// Copies code block `index` (0-based) of a rendered message. `Ok(false)` when nothing was
    /// copied.
    fn copy_code_block(&mut self, message_id: MessageId, index: usize) -> Result<bool, String>;
    fn request_render(&mut self);
    fn request_stop(&mut self);
}

const HELP_TEXT: &str = "Commands: /help, /clear, /copy [n], /cancel, /quit";
pub const ERROR_RUN_ALREADY_ACTIVE: &str = "Run already active";

/// Opening user turn of a fresh session.
pub const GREETING: &str = "Hello, how are you?";
/// Opening assistant turn of a fresh session.
pub const SAMPLE_DIAGRAM: &str = "```mermaid\ngraph TD\n    A[Christmas] -->|Get money| B(Go shopping)\n    B --> C{Let me think}\n    C -->|One| D[Laptop]\n    C -->|Two| E[iPhone]\n    C -->|Three| F[fa:fa-car Car]\n```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveReply {
    run_id: RunId,
    message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub mode: Mode,
    pub transcript: Vec<Message>,
    pub should_exit: bool,
    conversation: Vec<ChatMessage>,
    reply: Option<ActiveReply>,
    cancelling_run: Option<RunId>,
    system: Option<String>,
    next_message_id: MessageId,
}

impl Default for App {
    fn default() -> Self {
        Self::new(None)
    }
}

fn sanitize_system(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl App {
    pub fn new(system: Option<String>) -> Self {
        Self {
            mode: Mode::Idle,
            transcript: Vec::new(),
            should_exit: false,
            conversation: Vec::new(),
            reply: None,
            cancelling_run: None,
            system: sanitize_system(system),
            next_message_id: 1,
        }
    }

    /// Seeds the transcript with the opening greeting and a sample diagram reply. Both are
    /// part of the model-facing history.
    pub fn with_greeting(mut self) -> Self {
        self.push_message(MessageRole::User, GREETING);
        self.conversation.push(ChatMessage::user(GREETING));
        self.push_message(MessageRole::Assistant, SAMPLE_DIAGRAM);
        self.conversation.push(ChatMessage::assistant(SAMPLE_DIAGRAM));
        self
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// Returns model-facing conversation messages retained across turns.
    pub fn conversation_messages(&self) -> &[ChatMessage] {
        &self.conversation
    }

    /// Request body for the current conversation.
    pub fn request(&self) -> ChatRequest {
        let request = ChatRequest::new(self.conversation.clone());
        match &self.system {
            Some(system) => request.with_system(system.clone()),
            None => request,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.mode, Mode::Running { .. })
    }

    /// Appends a system message to transcript without mutating control state.
    pub fn push_system_message(&mut self, content: impl Into<String>) {
        self.push_message(MessageRole::System, content);
    }

    pub fn on_submit(&mut self, input: &str, host: &mut dyn HostOps) {
        let prompt = input.trim().to_string();

        if prompt.is_empty() {
            host.request_render();
            return;
        }

        if let Some(command) = parse_slash_command(&prompt) {
            match command {
                SlashCommand::Help => {
                    self.push_system_message(HELP_TEXT);
                    host.request_render();
                }
                SlashCommand::Clear => {
                    self.transcript.clear();
                    self.conversation.clear();
                    self.push_system_message("Transcript cleared");
                    host.request_render();
                }
                SlashCommand::Cancel => self.on_cancel(host),
                SlashCommand::Copy { block } => self.on_copy(block, host),
                SlashCommand::Quit => self.on_quit(host),
                SlashCommand::Unknown(command) => {
                    self.push_system_message(format!("Unknown command: {command}"));
                    host.request_render();
                }
            }

            return;
        }

        if self.is_running() {
            self.push_system_message("Run already in progress. Use /cancel to stop it.");
            host.request_render();
            return;
        }

        if self.cancelling_run.is_some() {
            self.push_system_message("Cancelling active run, please wait.");
            host.request_render();
            return;
        }

        self.push_message(MessageRole::User, prompt.clone());
        self.conversation.push(ChatMessage::user(prompt));

        match host.start_run(self.request()) {
            Ok(run_id) => {
                tracing::debug!(run_id, "run started");
                self.mode = Mode::Running { run_id };
            }
            Err(error) if error == ERROR_RUN_ALREADY_ACTIVE => {
                self.transcript.pop();
                self.conversation.pop();
                self.push_system_message("Run already in progress. Use /cancel to stop it.");
            }
            Err(error) => {
                self.push_system_message(format!("Failed to start run: {error}"));
                self.mode = Mode::Error(error);
            }
        }

        host.request_render();
    }

    pub fn on_cancel(&mut self, host: &mut dyn HostOps) {
        if self.cancelling_run.is_some() {
            host.request_render();
            return;
        }

        if let Mode::Running { run_id } = self.mode {
            self.cancelling_run = Some(run_id);
            if let Some(message) = self.reply_message_mut(run_id) {
                message.finish();
            }
            self.mode = Mode::Idle;
            self.push_system_message("Run cancelled");
            host.cancel_run(run_id);
        } else {
            self.push_system_message("No active run");
        }

        host.request_render();
    }

    pub fn on_quit(&mut self, host: &mut dyn HostOps) {
        if let Mode::Running { run_id } = self.mode {
            host.cancel_run(run_id);
        }
        self.mode = Mode::Exiting;
        self.should_exit = true;
        host.request_stop();
        host.request_render();
    }

    /// Copies the `block`-th (1-based) code block of the latest assistant reply.
    pub fn on_copy(&mut self, block: usize, host: &mut dyn HostOps) {
        let latest = self
            .transcript
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::Assistant)
            .map(|message| message.id);

        match latest {
            None => self.push_system_message("No assistant reply to copy from"),
            Some(message_id) => match host.copy_code_block(message_id, block.saturating_sub(1)) {
                Ok(true) => {}
                Ok(false) => self.push_system_message(format!("Code block {block} not copied")),
                Err(error) => self.push_system_message(format!("Copy failed: {error}")),
            },
        }

        host.request_render();
    }

    pub fn apply_run_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Started { run_id } => self.on_run_started(run_id),
            RunEvent::Chunk { run_id, text } => self.on_run_chunk(run_id, &text),
            RunEvent::ToolCall { run_id, call } => self.on_tool_call(run_id, &call),
            RunEvent::Finished { run_id, reason } => self.on_run_finished(run_id, reason),
            RunEvent::Failed { run_id, error } => self.on_run_failed(run_id, &error),
            RunEvent::Cancelled { run_id } => self.on_run_cancelled(run_id),
        }
    }

    pub fn on_run_started(&mut self, run_id: RunId) {
        if !self.is_active_run(run_id) || self.should_exit {
            return;
        }

        self.ensure_reply(run_id);
    }

    pub fn on_run_chunk(&mut self, run_id: RunId, chunk: &str) {
        if !self.is_active_run(run_id) || self.should_exit {
            return;
        }

        self.ensure_reply(run_id);
        if let Some(message) = self.reply_message_mut(run_id) {
            message.append(chunk);
        }
    }

    pub fn on_tool_call(&mut self, run_id: RunId, call: &ToolCall) {
        if !self.is_active_run(run_id) || self.should_exit {
            return;
        }

        self.push_system_message(format!(
            "Tool {} ({}) requested with {}",
            call.tool_name, call.tool_call_id, call.args
        ));
    }

    pub fn on_run_finished(&mut self, run_id: RunId, reason: FinishReason) {
        if !self.should_apply_run_event(run_id) {
            return;
        }

        if self.is_cancelling(run_id) {
            self.finalize_cancelled_run(run_id);
            return;
        }

        let text = self.reply_message_mut(run_id).map(|message| {
            message.finish();
            message.text.clone()
        });
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            self.conversation.push(ChatMessage::assistant(text));
        }
        self.reply = None;
        self.mode = Mode::Idle;

        match reason {
            FinishReason::Length => self.push_system_message("Reply stopped at the length limit"),
            FinishReason::ContentFilter => {
                self.push_system_message("Reply stopped by the content filter")
            }
            _ => {}
        }
    }

    pub fn on_run_failed(&mut self, run_id: RunId, error: &str) {
        if !self.should_apply_run_event(run_id) {
            return;
        }

        if self.is_cancelling(run_id) {
            self.finalize_cancelled_run(run_id);
            return;
        }

        let marked = self
            .reply_message_mut(run_id)
            .map(|message| message.fail(error))
            .is_some();
        if !marked {
            self.push_system_message(format!("Run failed: {error}"));
        }
        self.reply = None;
        self.mode = Mode::Error(error.to_string());
    }

    pub fn on_run_cancelled(&mut self, run_id: RunId) {
        if !self.should_apply_run_event(run_id) || !self.is_cancelling(run_id) {
            return;
        }

        self.finalize_cancelled_run(run_id);
    }

    fn should_apply_run_event(&self, run_id: RunId) -> bool {
        !self.should_exit && (self.is_active_run(run_id) || self.is_cancelling(run_id))
    }

    fn is_active_run(&self, run_id: RunId) -> bool {
        matches!(self.mode, Mode::Running { run_id: active } if active == run_id)
    }

    fn is_cancelling(&self, run_id: RunId) -> bool {
        self.cancelling_run == Some(run_id)
    }

    fn finalize_cancelled_run(&mut self, run_id: RunId) {
        if let Some(message) = self.reply_message_mut(run_id) {
            message.finish();
        }
        self.reply = None;
        self.cancelling_run = None;
        self.mode = Mode::Idle;
    }

    /// Makes sure the run has a streaming assistant entry, recreating it after `/clear`.
    fn ensure_reply(&mut self, run_id: RunId) {
        if self.reply_message_mut(run_id).is_some() {
            return;
        }

        let message_id = self.allocate_message_id();
        self.transcript.push(Message::streaming(message_id));
        self.reply = Some(ActiveReply { run_id, message_id });
    }

    fn reply_message_mut(&mut self, run_id: RunId) -> Option<&mut Message> {
        let reply = self.reply.filter(|reply| reply.run_id == run_id)?;
        self.transcript
            .iter_mut()
            .find(|message| message.id == reply.message_id)
    }

    fn push_message(&mut self, role: MessageRole, text: impl Into<String>) {
        let id = self.allocate_message_id();
        self.transcript.push(Message::new(id, role, text));
    }

    fn allocate_message_id(&mut self) -> MessageId {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }
}
