use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("stream line has no part code: {line:?}")]
    MissingCode { line: String },
    #[error("unknown stream part code `{code}`")]
    UnknownPart { code: String },
    #[error("malformed `{code}` part: {source}")]
    InvalidPayload {
        code: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stream line is not valid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Unknown part codes are forward-compatible additions and may be skipped by readers.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::UnknownPart { .. })
    }
}
