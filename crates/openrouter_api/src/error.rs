use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpenRouterError {
    #[error("OpenRouter API key is required")]
    MissingApiKey,
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("retry exhausted after max attempts (status: {}, last_error: {last_error:?})", status_label(.status))]
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    #[error("stream failed{}: {message}", code_suffix(.code))]
    StreamFailed {
        code: Option<String>,
        message: String,
    },
    #[error("request was cancelled")]
    Cancelled,
}

fn status_label(status: &Option<StatusCode>) -> String {
    status
        .map(|status| status.as_u16().to_string())
        .unwrap_or_else(|| "n/a".to_owned())
}

fn code_suffix(code: &Option<String>) -> String {
    match code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => format!(" ({code})"),
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorFields {
    message: Option<String>,
}

/// Extracts the upstream error message from a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) else {
        return fallback();
    };
    payload
        .error
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(fallback)
}

/// Renders an error `code` that may be a string or a number.
pub(crate) fn code_string(code: Option<&Value>) -> Option<String> {
    match code? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{code_string, parse_error_message, ErrorPayload, OpenRouterError};

    #[test]
    fn prefers_json_message() {
        assert_eq!(
            parse_error_message(
                StatusCode::UNAUTHORIZED,
                r#"{"error":{"message":"No auth credentials found","code":401}}"#
            ),
            "No auth credentials found"
        );
    }

    #[test]
    fn falls_back_to_body_then_reason() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "gateway down"),
            "gateway down"
        );
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, ""),
            "Bad Gateway"
        );
    }

    #[test]
    fn numeric_codes_render_as_text() {
        let payload: ErrorPayload =
            serde_json::from_str(r#"{"error":{"message":"m","code":429}}"#).expect("payload");
        assert!(payload.error.is_some());
        assert_eq!(code_string(Some(&json!(429))), Some("429".to_string()));
        assert_eq!(code_string(Some(&json!("busy"))), Some("busy".to_string()));
        assert_eq!(code_string(Some(&json!(null))), None);
    }

    #[test]
    fn stream_failure_display_includes_code() {
        let with_code = OpenRouterError::StreamFailed {
            code: Some("502".to_string()),
            message: "provider error".to_string(),
        };
        let without_code = OpenRouterError::StreamFailed {
            code: None,
            message: "provider error".to_string(),
        };
        assert_eq!(with_code.to_string(), "stream failed (502): provider error");
        assert_eq!(without_code.to_string(), "stream failed: provider error");
    }
}
