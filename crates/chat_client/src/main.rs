use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use chat_client::theme::thread_theme;
use chat_client::{
    App, ClientEvent, HttpTransport, InlineView, RuntimeController, DEFAULT_PROXY_URL,
};
use clap::Parser;
use diagram_chat::logging::initialize_logging;
use diagram_chat::{
    diagram, prewarm_code_highlighting, DiagramSupport, Osc52Clipboard, ThreadView, UiConfig,
};

const TICK: Duration = Duration::from_millis(50);
const DEFAULT_WIDTH: usize = 100;

#[derive(Debug, Parser)]
#[command(name = "chat", about = "Terminal chat that draws Mermaid diagrams once they finish streaming")]
struct Args {
    /// Chat endpoint served by chat-proxy.
    #[arg(long, default_value = DEFAULT_PROXY_URL)]
    proxy_url: String,

    /// System prompt sent with every request.
    #[arg(long, env = "CHAT_SYSTEM_PROMPT")]
    system: Option<String>,

    /// Render width in columns.
    #[arg(long, env = "COLUMNS")]
    width: Option<usize>,

    /// Start with an empty transcript.
    #[arg(long)]
    no_greeting: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let ui = UiConfig::from_env();

    // stderr output would tear the inline view, so logs need a file or an explicit --verbose.
    if ui.log_file.is_some() || args.verbose {
        initialize_logging(args.verbose, ui.log_file.as_deref().map(Path::new))
            .context("failed to open log file")?;
    }
    diagram::initialize(ui.diagram_config());

    let _ = thread::Builder::new()
        .name("code-highlight-prewarm".to_string())
        .spawn(prewarm_code_highlighting);

    let transport = HttpTransport::new(args.proxy_url).context("failed to build HTTP client")?;
    tracing::info!(proxy = %transport.url(), "starting chat client");

    let thread_view = ThreadView::new(thread_theme(ui.plain))
        .with_diagrams(DiagramSupport::mermaid())
        .with_copied_duration(ui.copied_duration);

    let (events, receiver) = mpsc::channel();
    spawn_input_reader(events.clone()).context("failed to spawn input reader")?;

    let mut controller = RuntimeController::new(
        Arc::new(transport),
        events,
        thread_view,
        Box::new(Osc52Clipboard::stdout()),
    );
    let mut app = App::new(args.system);
    if !args.no_greeting {
        app = app.with_greeting();
    }
    let mut view = InlineView::new(io::stdout(), args.width.unwrap_or(DEFAULT_WIDTH));

    loop {
        if controller.refresh(&app) {
            let lines = controller.render(view.width());
            view.redraw(&lines)?;
        }
        if app.should_exit || controller.stop_requested() {
            break;
        }

        match receiver.recv_timeout(TICK) {
            Ok(ClientEvent::Input(line)) => {
                view.input_echoed(&line);
                app.on_submit(&line, &mut controller);
            }
            Ok(ClientEvent::InputClosed) => app.on_quit(&mut controller),
            Ok(ClientEvent::Run(event)) => controller.apply_run_event(&mut app, event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    controller.shutdown();
    view.finish()?;
    Ok(())
}

fn spawn_input_reader(events: Sender<ClientEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("chat-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if events.send(ClientEvent::Input(line)).is_err() {
                    return;
                }
            }
            let _ = events.send(ClientEvent::InputClosed);
        })?;
    Ok(())
}
