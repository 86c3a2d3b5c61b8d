use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use chat_protocol::{DataStreamDecoder, FinishReason, StreamPart};
use chat_proxy::{router, AppState, ProxyConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Upstream {
    base_url: String,
    bodies: Arc<Mutex<Vec<Value>>>,
    requests: Arc<AtomicUsize>,
}

/// Serves each scripted `(status, body)` once, in order, recording request bodies.
async fn upstream(scripts: Vec<(u16, String)>) -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let requests = Arc::new(AtomicUsize::new(0));
    let scripts = Arc::new(scripts);

    tokio::spawn({
        let bodies = Arc::clone(&bodies);
        let requests = Arc::clone(&requests);
        async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let index = requests.fetch_add(1, Ordering::AcqRel);
                let body = read_body(&mut socket).await;
                if let Ok(value) = serde_json::from_slice::<Value>(&body) {
                    bodies.lock().expect("bodies lock").push(value);
                }
                let (status, payload) = scripts
                    .get(index)
                    .cloned()
                    .unwrap_or((500, "{}".to_string()));
                let content_type = if status == 200 {
                    "text/event-stream"
                } else {
                    "application/json"
                };
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                    payload.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        }
    });

    Upstream {
        base_url: format!("http://{addr}/api/v1"),
        bodies,
        requests,
    }
}

async fn read_body(socket: &mut TcpStream) -> Vec<u8> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 4096];
    let header_end = loop {
        let Ok(n) = socket.read(&mut buffer).await else {
            return Vec::new();
        };
        if n == 0 {
            return Vec::new();
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(position) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };
    let head = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < header_end + length {
        match socket.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buffer[..n]),
        }
    }
    request[header_end..].to_vec()
}

async fn proxy(upstream: &Upstream) -> String {
    let mut config = ProxyConfig::default();
    config.api_key = "sk-or-test".to_string();
    config.base_url = Some(upstream.base_url.clone());
    let app = router(AppState::new(&config).expect("state"));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind proxy");
    let addr = listener.local_addr().expect("proxy addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api/chat")
}

fn sse(frames: &[&str]) -> String {
    frames
        .iter()
        .map(|frame| format!("data: {frame}\n\n"))
        .collect()
}

async fn post(url: &str, body: Value) -> (reqwest::header::HeaderMap, Vec<StreamPart>) {
    let response = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("proxy reachable");
    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    let bytes = response.bytes().await.expect("body");

    let mut decoder = DataStreamDecoder::new();
    let mut parts: Vec<StreamPart> = decoder
        .push(&bytes)
        .into_iter()
        .map(|part| part.expect("valid part"))
        .collect();
    if let Some(part) = decoder.finish() {
        parts.push(part.expect("valid trailing part"));
    }
    (headers, parts)
}

#[tokio::test]
async fn streams_text_as_data_stream_parts() {
    let upstream = upstream(vec![(
        200,
        sse(&[
            r#"{"choices":[{"delta":{"content":"```mermaid\ngraph TD\n"}}]}"#,
            r#"{"choices":[{"delta":{"content":" A-->B\n```"},"finish_reason":"stop"}]}"#,
            r#"{"choices":[],"usage":{"prompt_tokens":7,"completion_tokens":3}}"#,
            "[DONE]",
        ]),
    )])
    .await;
    let url = proxy(&upstream).await;

    let (headers, parts) = post(
        &url,
        json!({ "messages": [{ "role": "user", "content": "draw" }] }),
    )
    .await;

    assert_eq!(headers["x-vercel-ai-data-stream"], "v1");
    assert_eq!(headers["content-type"], "text/plain; charset=utf-8");

    assert!(matches!(parts[0], StreamPart::Start { .. }));
    let text: String = parts
        .iter()
        .filter_map(|part| match part {
            StreamPart::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "```mermaid\ngraph TD\n A-->B\n```");
    assert!(matches!(
        parts.last(),
        Some(StreamPart::FinishMessage {
            finish_reason: FinishReason::Stop,
            usage,
        }) if usage.prompt_tokens == Some(7)
    ));
}

#[tokio::test]
async fn forwards_model_system_and_reshaped_tools() {
    let upstream = upstream(vec![(
        200,
        sse(&[r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#]),
    )])
    .await;
    let url = proxy(&upstream).await;

    post(
        &url,
        json!({
            "messages": [{ "role": "user", "content": "hi" }],
            "system": "You draw diagrams.",
            "tools": {
                "lookup": { "description": "ignored upstream" },
                "weather": { "parameters": { "type": "object", "properties": { "city": { "type": "string" } } } }
            }
        }),
    )
    .await;

    let bodies = upstream.bodies.lock().expect("bodies lock");
    let body = &bodies[0];
    assert_eq!(body["model"], "qwen/qwen3-8b:free");
    assert_eq!(body["stream"], true);
    assert_eq!(
        body["messages"],
        json!([
            { "role": "system", "content": "You draw diagrams." },
            { "role": "user", "content": "hi" }
        ])
    );
    assert_eq!(
        body["tools"],
        json!([
            {
                "type": "function",
                "function": { "name": "lookup", "parameters": { "type": "object", "properties": {} } }
            },
            {
                "type": "function",
                "function": {
                    "name": "weather",
                    "parameters": { "type": "object", "properties": { "city": { "type": "string" } } }
                }
            }
        ])
    );
}

#[tokio::test]
async fn emits_tool_call_part_from_fragments() {
    let upstream = upstream(vec![(
        200,
        sse(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"weather","arguments":"{\"city\":"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Oslo\"}"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        ]),
    )])
    .await;
    let url = proxy(&upstream).await;

    let (_, parts) = post(&url, json!({ "messages": [] })).await;

    let calls: Vec<&StreamPart> = parts
        .iter()
        .filter(|part| matches!(part, StreamPart::ToolCall(_)))
        .collect();
    assert_eq!(calls.len(), 1);
    let StreamPart::ToolCall(call) = calls[0] else {
        unreachable!();
    };
    assert_eq!(call.tool_call_id, "call_1");
    assert_eq!(call.tool_name, "weather");
    assert_eq!(call.args, json!({ "city": "Oslo" }));
    assert!(matches!(
        parts.last(),
        Some(StreamPart::FinishMessage {
            finish_reason: FinishReason::ToolCalls,
            ..
        })
    ));
}

#[tokio::test]
async fn upstream_rejection_becomes_error_part() {
    let upstream = upstream(vec![(
        401,
        r#"{"error":{"message":"No auth credentials found","code":401}}"#.to_string(),
    )])
    .await;
    let url = proxy(&upstream).await;

    let (_, parts) = post(
        &url,
        json!({ "messages": [{ "role": "user", "content": "hi" }] }),
    )
    .await;

    assert!(matches!(parts[0], StreamPart::Start { .. }));
    assert!(matches!(
        parts.last(),
        Some(StreamPart::Error(message)) if message.contains("No auth credentials found")
    ));
    assert_eq!(upstream.requests.load(Ordering::Acquire), 1);
}
