use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};

use crate::config::OpenRouterConfig;
use crate::error::{parse_error_message, OpenRouterError};
use crate::events::OpenRouterStreamEvent;
use crate::headers::build_headers;
use crate::payload::{ChatCompletionRequest, StreamOptions};
use crate::retry::{is_retryable_http_error, retry_delay_ms, MAX_RETRIES};
use crate::sse::SseStreamParser;
use crate::url::normalize_chat_completions_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct OpenRouterClient {
    http: Client,
    config: OpenRouterConfig,
}

#[derive(Debug, Clone)]
pub struct StreamResult {
    pub events: Vec<OpenRouterStreamEvent>,
    pub finish_reason: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, OpenRouterError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        normalize_chat_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, OpenRouterError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config)? {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| OpenRouterError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| OpenRouterError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, OpenRouterError> {
        let headers = self.build_headers()?;
        let payload = with_transport_defaults(request);
        Ok(self
            .http
            .post(self.endpoint())
            .headers(headers)
            .json(&payload))
    }

    pub async fn send_with_retry(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, OpenRouterError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if is_cancelled(cancellation) {
                return Err(OpenRouterError::Cancelled);
            }

            let response = self.build_request(request)?.send();
            let response = await_or_cancel(response, cancellation).await?;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        tracing::debug!(%status, attempt, "retrying OpenRouter request");
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }

                    return Err(OpenRouterError::Status { status, message });
                }
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt < MAX_RETRIES && !error.is_timeout() {
                        tracing::debug!(%error, attempt, "retrying OpenRouter request");
                        await_or_cancel(tokio::time::sleep(retry_delay_ms(attempt)), cancellation)
                            .await?;
                        continue;
                    }
                    return Err(OpenRouterError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(OpenRouterError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Streams one completion, handing each event to `on_event` in arrival order.
    ///
    /// Returns the last finish reason seen. An in-stream error event ends the stream with
    /// [`OpenRouterError::StreamFailed`] after the events before it were delivered.
    pub async fn stream_with_handler<F>(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<Option<String>, OpenRouterError>
    where
        F: FnMut(OpenRouterStreamEvent),
    {
        let response = self.send_with_retry(request, cancellation).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = SseStreamParser::default();
        let mut finish_reason = None;

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            let chunk = chunk?;
            for event in parser.feed(&chunk) {
                process_stream_event(event, &mut finish_reason, &mut on_event)?;
            }
        }

        if is_cancelled(cancellation) {
            return Err(OpenRouterError::Cancelled);
        }

        Ok(finish_reason)
    }

    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<StreamResult, OpenRouterError> {
        let mut events = Vec::new();
        let finish_reason = self
            .stream_with_handler(request, cancellation, |event| events.push(event))
            .await?;

        Ok(StreamResult {
            events,
            finish_reason,
        })
    }
}

fn with_transport_defaults(request: &ChatCompletionRequest) -> ChatCompletionRequest {
    let mut payload = request.clone();
    payload.stream = true;
    if payload.stream_options.is_none() {
        payload.stream_options = Some(StreamOptions {
            include_usage: true,
        });
    }
    if payload.tools.is_empty() {
        payload.tool_choice = None;
    }
    payload
}

fn process_stream_event<F>(
    event: OpenRouterStreamEvent,
    finish_reason: &mut Option<String>,
    on_event: &mut F,
) -> Result<(), OpenRouterError>
where
    F: FnMut(OpenRouterStreamEvent),
{
    match &event {
        OpenRouterStreamEvent::Error { code, message } => {
            return Err(OpenRouterError::StreamFailed {
                code: code.clone(),
                message: message.clone(),
            });
        }
        OpenRouterStreamEvent::Finish { reason } => *finish_reason = Some(reason.clone()),
        _ => {}
    }

    on_event(event);
    Ok(())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, OpenRouterError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(OpenRouterError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(OpenRouterError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{process_stream_event, with_transport_defaults};
    use crate::error::OpenRouterError;
    use crate::events::OpenRouterStreamEvent;
    use crate::payload::{ChatCompletionRequest, RequestMessage};
    use crate::sse::SseStreamParser;

    #[test]
    fn transport_defaults_force_streaming_with_usage() {
        let mut request =
            ChatCompletionRequest::new("qwen/qwen3-8b:free", vec![RequestMessage::new("user", "hi")]);
        request.stream = false;
        request.tool_choice = Some("auto".to_string());

        let payload = with_transport_defaults(&request);
        assert!(payload.stream);
        assert!(payload.stream_options.is_some_and(|options| options.include_usage));
        assert!(payload.tool_choice.is_none());
    }

    #[test]
    fn events_are_forwarded_in_parser_order_and_finish_tracked() {
        let frames = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"B\"},\"finish_reason\":\"stop\"}]}\n\n",
        );
        let mut finish_reason = None;
        let mut observed = Vec::new();
        for event in SseStreamParser::parse_frames(frames) {
            process_stream_event(event, &mut finish_reason, &mut |event| observed.push(event))
                .expect("events should process");
        }

        assert_eq!(finish_reason.as_deref(), Some("stop"));
        assert_eq!(observed.len(), 3);
        assert_eq!(
            observed[1],
            OpenRouterStreamEvent::TextDelta {
                delta: "B".to_string()
            }
        );
    }

    #[test]
    fn error_event_fails_the_stream() {
        let mut finish_reason = None;
        let mut observed = Vec::new();
        let error = process_stream_event(
            OpenRouterStreamEvent::Error {
                code: Some("502".to_string()),
                message: "provider returned error".to_string(),
            },
            &mut finish_reason,
            &mut |event| observed.push(event),
        )
        .expect_err("error event must fail");

        assert!(matches!(error, OpenRouterError::StreamFailed { .. }));
        assert!(observed.is_empty());
    }
}
