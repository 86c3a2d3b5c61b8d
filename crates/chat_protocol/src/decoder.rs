use crate::{parse_line, ProtocolError, StreamPart};

/// Incremental line decoder over arbitrary byte chunks.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte character; bytes are
/// buffered until a full line is available.
#[derive(Debug, Default)]
pub struct DataStreamDecoder {
    buffer: Vec<u8>,
}

impl DataStreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every part completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamPart, ProtocolError>> {
        self.buffer.extend_from_slice(chunk);

        let mut parts = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(part) = decode_line(&line[..newline]) {
                parts.push(part);
            }
        }
        parts
    }

    /// Decodes a final unterminated line, if any.
    pub fn finish(&mut self) -> Option<Result<StreamPart, ProtocolError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> Option<Result<StreamPart, ProtocolError>> {
    let line = match std::str::from_utf8(bytes) {
        Ok(line) => line.trim_end_matches('\r'),
        Err(_) => return Some(Err(ProtocolError::InvalidUtf8)),
    };
    if line.trim().is_empty() {
        return None;
    }
    Some(parse_line(line))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::DataStreamDecoder;
    use crate::{ProtocolError, StreamPart};

    fn texts(parts: Vec<Result<StreamPart, ProtocolError>>) -> Vec<String> {
        parts
            .into_iter()
            .map(|part| match part.expect("part decodes") {
                StreamPart::Text(text) => text,
                other => panic!("unexpected part {other:?}"),
            })
            .collect()
    }

    #[test]
    fn splits_lines_across_chunks() {
        let mut decoder = DataStreamDecoder::new();
        assert!(decoder.push(b"0:\"hel").is_empty());
        assert_eq!(texts(decoder.push(b"lo\"\n0:\"wor")), vec!["hello"]);
        assert_eq!(texts(decoder.push(b"ld\"\n\n")), vec!["world"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let line = "0:\"日本\"\n".as_bytes();
        let mut decoder = DataStreamDecoder::new();
        let (head, tail) = line.split_at(4);
        assert!(decoder.push(head).is_empty());
        assert_eq!(texts(decoder.push(tail)), vec!["日本"]);
    }

    #[test]
    fn trailing_line_without_newline_is_flushed() {
        let mut decoder = DataStreamDecoder::new();
        assert!(decoder.push(b"3:\"boom\"").is_empty());
        assert!(matches!(
            decoder.finish(),
            Some(Ok(StreamPart::Error(message))) if message == "boom"
        ));
    }

    #[test]
    fn crlf_and_bad_bytes() {
        let mut decoder = DataStreamDecoder::new();
        assert_eq!(texts(decoder.push(b"0:\"a\"\r\n")), vec!["a"]);
        let parts = decoder.push(b"0:\"\xff\"\n");
        assert!(matches!(parts.as_slice(), [Err(ProtocolError::InvalidUtf8)]));
    }
}
