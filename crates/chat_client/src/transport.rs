//! Data-stream transport to the chat proxy.
//!
//! Each run builds a current-thread tokio runtime on the calling worker thread, posts the
//! request body and lifts every decoded stream part into a [`RunEvent`].

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chat_protocol::{
    CancelSignal, ChatRequest, ChatTransport, DataStreamDecoder, ProtocolError, RunEvent, RunId,
    StreamPart,
};
use reqwest::{Client, StatusCode};
use thiserror::Error;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000/api/chat";

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to initialize tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("request to proxy failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("proxy returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed data stream: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("stream ended before the reply finished")]
    Truncated,
    #[error("run cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            http: Client::builder().build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn stream(
        &self,
        run_id: RunId,
        request: &ChatRequest,
        cancel: &CancelSignal,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), TransportError> {
        let mut response =
            await_or_cancel(self.http.post(&self.url).json(request).send(), cancel).await??;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancel)
                .await?
                .unwrap_or_default();
            return Err(TransportError::Status {
                status,
                body: body.trim().to_string(),
            });
        }

        let mut decoder = DataStreamDecoder::new();
        while let Some(chunk) = await_or_cancel(response.chunk(), cancel).await?? {
            for part in decoder.push(&chunk) {
                if deliver(run_id, part, emit)? {
                    return Ok(());
                }
            }
        }

        if let Some(part) = decoder.finish() {
            if deliver(run_id, part, emit)? {
                return Ok(());
            }
        }

        Err(TransportError::Truncated)
    }
}

impl ChatTransport for HttpTransport {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn run(
        &self,
        run_id: RunId,
        request: ChatRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| TransportError::Runtime(error).to_string())?;

        match runtime.block_on(self.stream(run_id, &request, &cancel, &mut *emit)) {
            Ok(()) => {}
            Err(TransportError::Cancelled) => emit(RunEvent::Cancelled { run_id }),
            Err(error) => {
                tracing::warn!(run_id, %error, "chat stream failed");
                emit(RunEvent::Failed {
                    run_id,
                    error: error.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Emits the event for one decoded part. Returns `true` once a terminal event went out.
fn deliver(
    run_id: RunId,
    part: Result<StreamPart, ProtocolError>,
    emit: &mut dyn FnMut(RunEvent),
) -> Result<bool, TransportError> {
    let part = match part {
        Ok(part) => part,
        Err(error) if error.is_skippable() => {
            tracing::debug!(run_id, %error, "skipping data stream part");
            return Ok(false);
        }
        Err(error) => return Err(error.into()),
    };

    match RunEvent::from_part(run_id, part) {
        Some(event) => {
            let terminal = event.is_terminal();
            emit(event);
            Ok(terminal)
        }
        None => Ok(false),
    }
}

async fn await_or_cancel<F>(future: F, cancel: &CancelSignal) -> Result<F::Output, TransportError>
where
    F: Future,
{
    let mut future = Box::pin(future);

    loop {
        if cancel.load(Ordering::Acquire) {
            return Err(TransportError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            return Ok(output);
        }
    }
}
