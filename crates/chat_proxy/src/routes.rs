use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use chat_protocol::{
    ChatRequest, StreamPart, DATA_STREAM_CONTENT_TYPE, DATA_STREAM_HEADER, DATA_STREAM_VERSION,
};
use openrouter_api::OpenRouterClient;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::translate::{upstream_request, StreamTranslator};
use crate::{ProxyConfig, ProxyError};

#[derive(Clone)]
pub struct AppState {
    client: Arc<OpenRouterClient>,
    model: Arc<str>,
}

impl AppState {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            client: Arc::new(OpenRouterClient::new(config.upstream())?),
            model: Arc::from(config.model.as_str()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ProxyError> {
    let upstream = upstream_request(state.model(), &request);
    let message_id = next_message_id();
    tracing::info!(
        %message_id,
        messages = request.messages.len(),
        tools = upstream.tools.len(),
        model = %state.model(),
        "proxying chat request"
    );

    let (tx, rx) = mpsc::unbounded_channel::<Result<String, Infallible>>();
    tokio::spawn(async move {
        let cancel = Arc::new(AtomicBool::new(false));
        let send = |part: StreamPart| {
            if tx.send(Ok(part.encode())).is_err() {
                cancel.store(true, Ordering::Release);
            }
        };

        let mut translator = StreamTranslator::new(message_id.clone());
        send(translator.start());
        let result = state
            .client
            .stream_with_handler(&upstream, Some(&cancel), |event| {
                for part in translator.on_event(event) {
                    send(part);
                }
            })
            .await;

        let closing = match result {
            Ok(_) => translator.finish(),
            Err(error) => {
                tracing::warn!(%message_id, %error, "upstream stream failed");
                translator.fail(error)
            }
        };
        for part in closing {
            send(part);
        }
        tracing::debug!(%message_id, "chat stream closed");
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(DATA_STREAM_CONTENT_TYPE))
        .header(DATA_STREAM_HEADER, HeaderValue::from_static(DATA_STREAM_VERSION))
        .body(Body::from_stream(UnboundedReceiverStream::new(rx)))
        .map_err(|error| ProxyError::Response(error.to_string()))
}

fn next_message_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("msg-{millis:x}-{sequence:04x}")
}
