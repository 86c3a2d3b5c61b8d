mod support;

use chat_client::app::Mode;
use chat_client::App;
use chat_protocol::RunEvent;
use diagram_chat::MessageStatus;
use support::{Harness, Script, ScriptedTransport};

#[test]
fn cancel_stops_worker_and_discards_late_output() {
    let mut harness = Harness::new(
        App::default(),
        ScriptedTransport::new(Script::WaitForCancel),
    );

    harness.submit("tell me everything");
    harness.pump_events(2);
    harness.submit("second prompt");
    assert_eq!(
        harness.app.transcript.last().map(|m| m.text.as_str()),
        Some("Run already in progress. Use /cancel to stop it.")
    );

    harness.submit("/cancel");
    assert_eq!(harness.app.mode, Mode::Idle);
    let events = harness.pump_until_terminal();

    assert_eq!(
        events,
        vec![
            RunEvent::Chunk {
                run_id: 1,
                text: " after cancel".to_string()
            },
            RunEvent::Cancelled { run_id: 1 }
        ]
    );
    assert_eq!(harness.controller.active_run_id(), None);

    let reply = harness
        .app
        .transcript
        .iter()
        .find(|message| message.role == diagram_chat::MessageRole::Assistant)
        .expect("partial reply kept");
    assert_eq!(reply.text, "partial");
    assert_eq!(reply.status, MessageStatus::Complete);
    assert_eq!(harness.app.conversation_messages().len(), 1);
}

#[test]
fn cancel_without_run_reports_no_active_run() {
    let mut harness = Harness::new(App::default(), ScriptedTransport::new(Script::Silent));

    harness.submit("/cancel");

    assert_eq!(
        harness.app.transcript.last().map(|m| m.text.as_str()),
        Some("No active run")
    );
}

#[test]
fn shutdown_cancels_running_worker() {
    let mut harness = Harness::new(
        App::default(),
        ScriptedTransport::new(Script::WaitForCancel),
    );

    harness.submit("keep going");
    harness.controller.shutdown();

    let events = harness.pump_until_terminal();
    assert_eq!(events.last(), Some(&RunEvent::Cancelled { run_id: 1 }));
}
