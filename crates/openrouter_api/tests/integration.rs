use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use openrouter_api::{
    ChatCompletionRequest, OpenRouterClient, OpenRouterConfig, OpenRouterError,
    OpenRouterStreamEvent, RequestMessage,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
enum ScriptedResponse {
    Respond {
        status: u16,
        content_type: &'static str,
        chunks: Vec<ResponseChunk>,
    },
    Reset,
}

struct ScriptedServer {
    base_url: String,
    request_count: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let request_count = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}/api/v1");

        let handle = tokio::spawn({
            let scripts = Arc::clone(&scripts);
            let request_count = Arc::clone(&request_count);
            let bodies = Arc::clone(&bodies);

            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let scripts = Arc::clone(&scripts);
                    let request_count = Arc::clone(&request_count);
                    let bodies = Arc::clone(&bodies);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, request_count, bodies).await;
                    });
                }
            }
        });

        Self {
            base_url,
            request_count,
            bodies,
            handle,
        }
    }

    fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    fn last_body(&self) -> Value {
        let bodies = self.bodies.lock().expect("bodies lock");
        let body = bodies.last().expect("at least one request");
        serde_json::from_slice(body).expect("request body is JSON")
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn response_sse(status: u16, frames: &[&str]) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: sse_frames(frames),
        }],
    }
}

fn response_json(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse::Respond {
        status,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

fn sse_frames(frames: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    body.into_bytes()
}

fn request() -> ChatCompletionRequest {
    ChatCompletionRequest::new("qwen/qwen3-8b:free", vec![RequestMessage::new("user", "hi")])
}

fn client(server: &ScriptedServer) -> OpenRouterClient {
    OpenRouterClient::new(OpenRouterConfig::new("test-key").with_base_url(&server.base_url))
        .expect("client")
}

#[tokio::test]
async fn stream_integration_successful_completion() {
    let server = ScriptedServer::new(vec![response_sse(
        200,
        &[
            r#"{"choices":[{"delta":{"content":"hello"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ],
    )])
    .await;

    let result = client(&server)
        .stream(&request(), None)
        .await
        .expect("stream should succeed");

    assert_eq!(result.finish_reason.as_deref(), Some("stop"));
    assert_eq!(
        result.events[0],
        OpenRouterStreamEvent::TextDelta {
            delta: "hello".to_string()
        }
    );

    let body = server.last_body();
    assert_eq!(body["model"], "qwen/qwen3-8b:free");
    assert_eq!(body["stream"], true);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_in_stream_error_fails() {
    let server = ScriptedServer::new(vec![response_sse(
        200,
        &[
            r#"{"choices":[{"delta":{"content":"par"}}]}"#,
            r#"{"error":{"code":502,"message":"Provider returned error"}}"#,
        ],
    )])
    .await;

    let mut seen = Vec::new();
    let error = client(&server)
        .stream_with_handler(&request(), None, |event| seen.push(event))
        .await
        .expect_err("error frame should fail the stream");

    assert!(matches!(
        error,
        OpenRouterError::StreamFailed { ref code, .. } if code.as_deref() == Some("502")
    ));
    assert_eq!(seen.len(), 1);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_retryable_then_success() {
    let server = ScriptedServer::new(vec![
        response_json(503, r#"{"error":{"message":"overloaded"}}"#),
        response_sse(200, &[r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#]),
    ])
    .await;

    let result = timeout(Duration::from_secs(12), client(&server).stream(&request(), None))
        .await
        .expect("retry path should be bounded")
        .expect("stream should eventually succeed");

    assert_eq!(result.finish_reason.as_deref(), Some("stop"));
    assert_eq!(server.request_count(), 2);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_non_retryable_status_fails_explicitly() {
    let server = ScriptedServer::new(vec![response_json(
        401,
        r#"{"error":{"message":"No auth credentials found","code":401}}"#,
    )])
    .await;

    let error = client(&server)
        .stream(&request(), None)
        .await
        .expect_err("stream should fail");
    assert!(matches!(
        error,
        OpenRouterError::Status { status, ref message }
            if status.as_u16() == 401 && message == "No auth credentials found"
    ));
    assert_eq!(server.request_count(), 1);

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_cancellation_during_stream() {
    let server = ScriptedServer::new(vec![ScriptedResponse::Respond {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: sse_frames(&[r#"{"choices":[{"delta":{"content":"stream"}}]}"#]),
            },
            ResponseChunk {
                delay_ms: 400,
                bytes: sse_frames(&[r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#]),
            },
        ],
    }])
    .await;

    let client = Arc::new(client(&server));
    let cancellation = Arc::new(AtomicBool::new(false));
    let stream_task = tokio::spawn({
        let client = Arc::clone(&client);
        let cancellation = Arc::clone(&cancellation);
        async move { client.stream(&request(), Some(&cancellation)).await }
    });

    sleep(Duration::from_millis(120)).await;
    cancellation.store(true, Ordering::Release);

    let error = timeout(Duration::from_secs(5), stream_task)
        .await
        .expect("stream task should resolve")
        .expect("join handle should resolve")
        .expect_err("cancellation should abort stream");

    assert!(matches!(error, OpenRouterError::Cancelled));
    server.shutdown();
}

#[tokio::test]
async fn stream_integration_connection_reset_then_retry_exhausted() {
    let server = ScriptedServer::new(vec![
        ScriptedResponse::Reset,
        ScriptedResponse::Reset,
        ScriptedResponse::Reset,
        ScriptedResponse::Reset,
    ])
    .await;

    let error = timeout(Duration::from_secs(20), client(&server).stream(&request(), None))
        .await
        .expect("retry path should resolve")
        .expect_err("connection reset should surface as failure");

    assert!(matches!(
        error,
        OpenRouterError::RetryExhausted { status: None, .. }
    ));
    assert!(server.request_count() >= 4);

    server.shutdown();
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    request_count: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Vec<u8>>>>,
) {
    let Ok(body) = read_request(&mut socket).await else {
        return;
    };

    let index = request_count.fetch_add(1, Ordering::AcqRel);
    if let Ok(mut bodies) = bodies.lock() {
        bodies.push(body);
    }
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| response_json(500, r#"{"error":{"message":"unexpected request"}}"#));

    match response {
        ScriptedResponse::Reset => {}
        ScriptedResponse::Respond {
            status,
            content_type,
            chunks,
        } => {
            let headers = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                status_reason(status),
                content_type,
            );

            if socket.write_all(headers.as_bytes()).await.is_err() {
                return;
            }

            for chunk in chunks {
                if chunk.delay_ms > 0 {
                    sleep(Duration::from_millis(chunk.delay_ms)).await;
                }
                let prefix = format!("{:X}\r\n", chunk.bytes.len());
                if socket.write_all(prefix.as_bytes()).await.is_err() {
                    return;
                }
                if socket.write_all(&chunk.bytes).await.is_err() {
                    return;
                }
                if socket.write_all(b"\r\n").await.is_err() {
                    return;
                }
            }

            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    }
}

/// Reads headers and a `Content-Length` body, returning the body bytes.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(Vec::new());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(position) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }

    Ok(request[header_end..].to_vec())
}
