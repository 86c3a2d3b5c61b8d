//! Copy-to-clipboard affordance with a timed "copied" indicator.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// How long the copied indicator stays on after a successful copy.
pub const DEFAULT_COPIED_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to write to the clipboard: {0}")]
    Io(#[from] io::Error),

    #[error("clipboard is unavailable: {0}")]
    Unavailable(String),
}

/// Platform clipboard sink.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard that asks the terminal to set the system selection via OSC 52.
#[derive(Debug)]
pub struct Osc52Clipboard<W: Write> {
    writer: W,
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let payload = STANDARD.encode(text.as_bytes());
        write!(self.writer, "\x1b]52;c;{payload}\x07")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Tracks the copied state for one copy button.
///
/// Every successful copy moves the reset deadline to `now + copied_duration`, so a second copy
/// inside the window extends it rather than cutting it short.
#[derive(Debug, Clone)]
pub struct CopyToClipboard {
    copied_duration: Duration,
    copied_until: Option<Instant>,
}

impl Default for CopyToClipboard {
    fn default() -> Self {
        Self::new(DEFAULT_COPIED_DURATION)
    }
}

impl CopyToClipboard {
    pub fn new(copied_duration: Duration) -> Self {
        Self {
            copied_duration,
            copied_until: None,
        }
    }

    pub fn copied_duration(&self) -> Duration {
        self.copied_duration
    }

    /// Copies `value`. Returns `Ok(false)` without touching the clipboard when `value` is empty.
    pub fn copy(
        &mut self,
        clipboard: &mut dyn Clipboard,
        value: &str,
    ) -> Result<bool, ClipboardError> {
        self.copy_at(clipboard, value, Instant::now())
    }

    pub fn copy_at(
        &mut self,
        clipboard: &mut dyn Clipboard,
        value: &str,
        now: Instant,
    ) -> Result<bool, ClipboardError> {
        if value.is_empty() {
            return Ok(false);
        }
        clipboard.write_text(value)?;
        self.copied_until = Some(now + self.copied_duration);
        tracing::debug!(bytes = value.len(), "copied to clipboard");
        Ok(true)
    }

    pub fn is_copied(&self) -> bool {
        self.is_copied_at(Instant::now())
    }

    pub fn is_copied_at(&self, now: Instant) -> bool {
        self.copied_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{Clipboard, ClipboardError, CopyToClipboard, Osc52Clipboard};

    #[derive(Default)]
    struct RecordingClipboard {
        writes: Vec<String>,
        fail: bool,
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("denied".to_string()));
            }
            self.writes.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn empty_value_is_a_no_op() {
        let mut clipboard = RecordingClipboard::default();
        let mut copy = CopyToClipboard::default();
        let now = Instant::now();

        assert!(!copy.copy_at(&mut clipboard, "", now).expect("no error"));
        assert!(clipboard.writes.is_empty());
        assert!(!copy.is_copied_at(now));
    }

    #[test]
    fn copied_flag_expires_after_duration() {
        let mut clipboard = RecordingClipboard::default();
        let mut copy = CopyToClipboard::default();
        let start = Instant::now();

        assert!(copy.copy_at(&mut clipboard, "fn main() {}", start).expect("copy"));
        assert_eq!(clipboard.writes, vec!["fn main() {}".to_string()]);
        assert!(copy.is_copied_at(start + Duration::from_millis(2999)));
        assert!(!copy.is_copied_at(start + Duration::from_millis(3000)));
    }

    #[test]
    fn second_copy_extends_the_window() {
        let mut clipboard = RecordingClipboard::default();
        let mut copy = CopyToClipboard::new(Duration::from_millis(3000));
        let start = Instant::now();

        copy.copy_at(&mut clipboard, "a", start).expect("first copy");
        copy.copy_at(&mut clipboard, "b", start + Duration::from_millis(2000))
            .expect("second copy");

        assert!(copy.is_copied_at(start + Duration::from_millis(3500)));
        assert!(copy.is_copied_at(start + Duration::from_millis(4999)));
        assert!(!copy.is_copied_at(start + Duration::from_millis(5000)));
    }

    #[test]
    fn failure_is_returned_and_flag_stays_off() {
        let mut clipboard = RecordingClipboard {
            fail: true,
            ..RecordingClipboard::default()
        };
        let mut copy = CopyToClipboard::default();
        let now = Instant::now();

        let error = copy
            .copy_at(&mut clipboard, "text", now)
            .expect_err("clipboard refused");
        assert!(matches!(error, ClipboardError::Unavailable(_)));
        assert!(!copy.is_copied_at(now));
    }

    #[test]
    fn osc52_sequence_is_base64_encoded() {
        let mut clipboard = Osc52Clipboard::new(Vec::new());
        clipboard.write_text("hi").expect("write to vec");
        assert_eq!(clipboard.into_inner(), b"\x1b]52;c;aGk=\x07".to_vec());
    }
}
